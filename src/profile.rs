//! Player profile document and the fetcher for single-account lookups.
//!
//! The document shape is fixed by the third-party service. Beyond a
//! successful JSON parse no validation happens here; consumers deal with
//! schema drift.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;
use crate::transport::{is_success, Transport};

/// Deadline for a single profile document.
pub const PROFILE_TIMEOUT: Duration = Duration::from_secs(20);

/// A player's full statistics document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub aid: u64,
    pub info: PlayerInfo,
    #[serde(default)]
    pub customization: PlayerCustomization,
    pub skills: Option<PlayerSkills>,
    pub equipment: Option<EquipmentContainer>,
    pub pmc_stats: Option<GameStats>,
    pub scav_stats: Option<GameStats>,
    pub achievements: Option<HashMap<String, i64>>,
    pub updated: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub nickname: String,
    pub side: String,
    pub experience: i64,
    pub member_category: Option<i64>,
    pub selected_member_category: Option<i64>,
    pub prestige_level: Option<i64>,
}

/// Visual customization references (template ids).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerCustomization {
    pub head: Option<String>,
    pub body: Option<String>,
    pub feet: Option<String>,
    pub hands: Option<String>,
}

/// Equipped items as a flat list forming a tree via `parent_id`/`slot_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentContainer {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Items", default)]
    pub items: Vec<EquipmentItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_tpl")]
    pub template: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,
    #[serde(rename = "slotId")]
    pub slot_id: Option<String>,
    pub upd: Option<ItemUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemUpdate {
    #[serde(rename = "StackObjectsCount")]
    pub stack_objects_count: Option<i64>,
    #[serde(rename = "Repairable")]
    pub repairable: Option<RepairableState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepairableState {
    #[serde(rename = "Durability")]
    pub durability: Option<f64>,
    #[serde(rename = "MaxDurability")]
    pub max_durability: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSkills {
    #[serde(rename = "Common", default)]
    pub common: Vec<SkillEntry>,
    #[serde(rename = "Mastering", default)]
    pub mastering: Vec<MasteringEntry>,
    #[serde(rename = "Points")]
    pub points: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillEntry {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Progress")]
    pub progress: f64,
    #[serde(rename = "PointsEarnedDuringSession")]
    pub points_earned_during_session: Option<f64>,
    #[serde(rename = "LastAccess")]
    pub last_access: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasteringEntry {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Progress")]
    pub progress: Option<f64>,
}

/// Per-faction statistics block (PMC or Scav).
#[derive(Debug, Clone, Deserialize)]
pub struct GameStats {
    pub eft: Option<EftStats>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EftStats {
    pub total_in_game_time: Option<i64>,
    pub over_all_counters: Option<OverallCounters>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverallCounters {
    #[serde(rename = "Items", default)]
    pub items: Vec<CounterItem>,
}

/// One raid counter, keyed by a tagged label tuple
/// (e.g. `["ExitStatus", "Survived", "Pmc"]`).
#[derive(Debug, Clone, Deserialize)]
pub struct CounterItem {
    #[serde(rename = "Key")]
    pub key: Vec<String>,
    #[serde(rename = "Value")]
    pub value: i64,
}

/// Fetches `{base_url}/{account_id}.json`. A 404 maps to
/// [`ApiError::PlayerNotFound`] so callers can distinguish "no such player"
/// from transport trouble.
pub(crate) async fn fetch_profile(
    transport: &Transport,
    base_url: &str,
    account_id: &str,
) -> Result<PlayerProfile, ApiError> {
    let url = format!("{base_url}/{account_id}.json");
    tracing::info!(account_id, "fetching player profile");

    let response = transport.get(&url, PROFILE_TIMEOUT).await?;
    match response.status() {
        404 => Err(ApiError::PlayerNotFound),
        status if !is_success(status) => Err(ApiError::from_status(status)),
        _ => {
            let text = response.text().await?;
            let profile: PlayerProfile =
                serde_json::from_str(&text).map_err(|err| ApiError::Malformed(err.to_string()))?;
            tracing::info!(nickname = %profile.info.nickname, "profile loaded");
            Ok(profile)
        }
    }
}
