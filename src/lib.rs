//! tarkov-stats library: client core for Escape from Tarkov player
//! statistics served by a public third-party JSON API.
//!
//! The centerpiece is the player-name index subsystem: a ~66MB id -> name
//! document downloaded at most once per process, cached in memory behind a
//! single-flight loader, and queried with ranked substring matching. Around
//! it sit the transport layer (direct access with an ordered relay fallback
//! for cross-origin-restricted hosts) and the per-account profile fetcher.

pub mod client;
pub mod error;
pub mod index;
pub mod profile;
pub mod search;
pub mod stats;
pub mod transport;

pub use client::{TarkovClient, TarkovClientBuilder, DEFAULT_PROFILE_BASE_URL};
pub use error::ApiError;
pub use index::{LoadStage, PlayerIndex};
pub use profile::PlayerProfile;
pub use search::{is_account_id, SearchResult};
pub use transport::AccessPolicy;
