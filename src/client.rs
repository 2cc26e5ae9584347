//! Facade tying transport, index loader, search, and profile fetch together.
//!
//! One `TarkovClient` is constructed at process start and shared; all cache
//! state lives inside it rather than in module-level globals.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::index::{IndexLoader, LoadStage, INDEX_TIMEOUT};
use crate::profile::{self, PlayerProfile};
use crate::search::{self, SearchResult};
use crate::transport::{AccessPolicy, HttpFetch, ReqwestFetch, Transport};

/// Profile service serving both the bulk index and per-account documents.
pub const DEFAULT_PROFILE_BASE_URL: &str = "https://players.tarkov.dev/profile";

pub struct TarkovClient {
    transport: Arc<Transport>,
    index: Arc<IndexLoader>,
    profile_base: String,
}

impl TarkovClient {
    pub fn new(policy: AccessPolicy) -> Self {
        Self::builder().access_policy(policy).build()
    }

    pub fn builder() -> TarkovClientBuilder {
        TarkovClientBuilder::default()
    }

    /// Ranked name search, capped at [`search::MAX_RESULTS`]. Suspends until
    /// the index is available, joining an in-flight load if one is running.
    /// Zero matches is an empty vec, not an error; only index-load failures
    /// propagate.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let index = self.index.get().await?;
        Ok(search::rank_matches(&index, query, search::MAX_RESULTS))
    }

    /// Fetches one player's full statistics document by account id.
    pub async fn fetch_profile(&self, account_id: &str) -> Result<PlayerProfile, ApiError> {
        profile::fetch_profile(&self.transport, &self.profile_base, account_id).await
    }

    pub fn is_index_cached(&self) -> bool {
        self.index.is_cached()
    }

    pub fn is_index_loading(&self) -> bool {
        self.index.is_loading()
    }

    /// Stage of an in-flight index load, for UIs that branch on identity.
    pub fn index_load_stage(&self) -> Option<LoadStage> {
        self.index.stage()
    }

    /// Human-readable progress line for an in-flight index load.
    pub fn index_load_progress(&self) -> Option<String> {
        self.index.progress_text()
    }

    /// Fire-and-forget index warm-up, meant to be triggered when a search
    /// surface appears so the index is hot by the time a query is submitted.
    pub fn preload_index(&self) {
        self.index.preload();
    }

    /// Discards the cached index; the next search downloads it afresh.
    pub fn clear_index_cache(&self) {
        self.index.clear();
    }
}

pub struct TarkovClientBuilder {
    profile_base: String,
    policy: AccessPolicy,
    index_timeout: Duration,
    fetcher: Option<Arc<dyn HttpFetch>>,
}

impl Default for TarkovClientBuilder {
    fn default() -> Self {
        Self {
            profile_base: DEFAULT_PROFILE_BASE_URL.to_string(),
            policy: AccessPolicy::Direct,
            index_timeout: INDEX_TIMEOUT,
            fetcher: None,
        }
    }
}

impl TarkovClientBuilder {
    pub fn profile_base_url(mut self, base: impl Into<String>) -> Self {
        self.profile_base = base.into();
        self
    }

    pub fn access_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Deadline for the bulk index download.
    pub fn index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    /// Substitute the raw fetch implementation (used by tests).
    pub fn http_fetch(mut self, fetcher: Arc<dyn HttpFetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn build(self) -> TarkovClient {
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(ReqwestFetch::new()));
        let transport = Arc::new(Transport::with_fetcher(fetcher, self.policy));
        let index_url = format!("{}/index.json", self.profile_base);
        let index = Arc::new(IndexLoader::new(
            Arc::clone(&transport),
            index_url,
            self.index_timeout,
        ));
        TarkovClient {
            transport,
            index,
            profile_base: self.profile_base,
        }
    }
}
