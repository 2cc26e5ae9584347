//! Player-name index: a bulk id -> display-name document downloaded once per
//! process, cached in memory, and shared by every search.
//!
//! The loader guarantees at most one in-flight download system-wide.
//! Concurrent callers join the in-flight attempt and observe the exact same
//! outcome; a failed attempt resets the state so a later call can retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use foldhash::HashMap;
use tokio::sync::watch;

use crate::error::ApiError;
use crate::transport::{is_success, Transport};

/// Deadline for the bulk index download. The document is tens of megabytes,
/// so this is far longer than the per-profile timeout.
pub const INDEX_TIMEOUT: Duration = Duration::from_secs(120);

/// Immutable mapping from decimal account-id string to display name.
/// Built exactly once per load; replaced wholesale or not at all.
#[derive(Debug, Default)]
pub struct PlayerIndex {
    entries: HashMap<String, String>,
}

impl PlayerIndex {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_of(&self, account_id: &str) -> Option<&str> {
        self.entries.get(account_id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }
}

/// Where an in-flight load currently is. Display text lives in
/// [`LoadStage::description`] so callers can branch on stage identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Connecting,
    Downloading,
    Parsing,
}

impl LoadStage {
    /// User-facing stage text shown next to a progress indicator.
    pub fn description(self) -> &'static str {
        match self {
            LoadStage::Connecting => "Connecting to player database...",
            LoadStage::Downloading => "Downloading player database (~66MB)...",
            LoadStage::Parsing => "Parsing player database...",
        }
    }
}

type LoadOutcome = Result<Arc<PlayerIndex>, ApiError>;

enum LoadState {
    NotStarted,
    Loading {
        stage: LoadStage,
        done: watch::Receiver<Option<LoadOutcome>>,
    },
    Loaded(Arc<PlayerIndex>),
}

/// Single-flight loader and process-wide cache for the player index.
pub struct IndexLoader {
    transport: Arc<Transport>,
    index_url: String,
    timeout: Duration,
    state: Mutex<LoadState>,
    // Bumped by clear(); a leader finishing against a stale epoch must not
    // repopulate the cache.
    epoch: AtomicU64,
}

enum Role {
    Leader {
        publish: watch::Sender<Option<LoadOutcome>>,
        epoch: u64,
    },
    Waiter(watch::Receiver<Option<LoadOutcome>>),
}

impl IndexLoader {
    pub fn new(transport: Arc<Transport>, index_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            index_url: index_url.into(),
            timeout,
            state: Mutex::new(LoadState::NotStarted),
            epoch: AtomicU64::new(0),
        }
    }

    // The state lock is only ever held between suspension points, so a
    // poisoned lock just means a panic elsewhere; take the data anyway.
    fn lock_state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached index, joining an in-flight download or starting a
    /// fresh one as needed. All callers of the same attempt resolve to the
    /// same `Arc` (or the same error).
    pub async fn get(&self) -> Result<Arc<PlayerIndex>, ApiError> {
        let role = {
            let mut state = self.lock_state();
            match &*state {
                LoadState::Loaded(index) => return Ok(Arc::clone(index)),
                LoadState::Loading { done, .. } => Role::Waiter(done.clone()),
                LoadState::NotStarted => {
                    let (publish, done) = watch::channel(None);
                    *state = LoadState::Loading {
                        stage: LoadStage::Connecting,
                        done,
                    };
                    Role::Leader {
                        publish,
                        epoch: self.epoch.load(Ordering::Acquire),
                    }
                }
            }
        };

        match role {
            Role::Waiter(done) => self.await_outcome(done).await,
            Role::Leader { publish, epoch } => {
                let outcome = self.download_and_parse().await;
                self.finish(epoch, &outcome);
                let _ = publish.send(Some(outcome.clone()));
                outcome
            }
        }
    }

    async fn await_outcome(
        &self,
        mut done: watch::Receiver<Option<LoadOutcome>>,
    ) -> Result<Arc<PlayerIndex>, ApiError> {
        loop {
            if let Some(outcome) = done.borrow_and_update().clone() {
                return outcome;
            }
            if done.changed().await.is_err() {
                // The leading task was dropped before publishing. Clear the
                // stale marker so the next caller can retry, but only if it
                // is still the abandoned attempt that occupies the slot.
                let mut state = self.lock_state();
                if let LoadState::Loading { done, .. } = &*state {
                    if done.has_changed().is_err() {
                        *state = LoadState::NotStarted;
                    }
                }
                return Err(ApiError::network("index load was interrupted"));
            }
        }
    }

    async fn download_and_parse(&self) -> LoadOutcome {
        tracing::info!(url = %self.index_url, "fetching player index");
        let response = self.transport.get(&self.index_url, self.timeout).await?;
        if !is_success(response.status()) {
            return Err(ApiError::from_status(response.status()));
        }

        self.set_stage(LoadStage::Downloading);
        let text = response.text().await?;
        tracing::info!(
            megabytes = text.len() / (1024 * 1024),
            "index downloaded, parsing"
        );

        self.set_stage(LoadStage::Parsing);
        let entries: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|err| ApiError::Malformed(err.to_string()))?;
        let index = Arc::new(PlayerIndex { entries });
        tracing::info!(entries = index.len(), "player index loaded");
        Ok(index)
    }

    fn finish(&self, epoch: u64, outcome: &LoadOutcome) {
        let mut state = self.lock_state();
        if self.epoch.load(Ordering::Acquire) != epoch {
            // clear() ran while this attempt was in flight; its result is
            // stale and the cache stays empty.
            return;
        }
        *state = match outcome {
            Ok(index) => LoadState::Loaded(Arc::clone(index)),
            Err(_) => LoadState::NotStarted,
        };
    }

    fn set_stage(&self, stage: LoadStage) {
        let mut state = self.lock_state();
        if let LoadState::Loading { stage: current, .. } = &mut *state {
            *current = stage;
        }
    }

    /// Kicks off a background load if none has started. No-op while a load is
    /// in flight or after one completed. Errors are logged and swallowed; a
    /// later explicit `get()` observes the reset state and retries.
    pub fn preload(self: &Arc<Self>) {
        {
            let state = self.lock_state();
            if !matches!(*state, LoadState::NotStarted) {
                return;
            }
        }
        tracing::info!("preloading player index in the background");
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = loader.get().await {
                tracing::warn!(error = %err, "index preload failed");
            }
        });
    }

    /// Unconditionally discards the cached index and any in-flight-load
    /// bookkeeping, returning to the not-started state.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let mut state = self.lock_state();
        *state = LoadState::NotStarted;
        tracing::info!("player index cache cleared");
    }

    pub fn is_cached(&self) -> bool {
        matches!(*self.lock_state(), LoadState::Loaded(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.lock_state(), LoadState::Loading { .. })
    }

    /// Current stage of an in-flight load, `None` otherwise.
    pub fn stage(&self) -> Option<LoadStage> {
        match &*self.lock_state() {
            LoadState::Loading { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Human-readable stage text for UI polling, `None` when no load is in
    /// flight.
    pub fn progress_text(&self) -> Option<String> {
        self.stage().map(|stage| stage.description().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fakes::ScriptedFetch;
    use crate::transport::AccessPolicy;

    const INDEX_URL: &str = "https://players.tarkov.dev/profile/index.json";
    const INDEX_BODY: &str = r#"{"1":"Alpha","2":"Bravo","3":"Charlie"}"#;

    fn loader_with(fetch: Arc<ScriptedFetch>) -> Arc<IndexLoader> {
        let transport = Arc::new(Transport::with_fetcher(fetch, AccessPolicy::Direct));
        Arc::new(IndexLoader::new(transport, INDEX_URL, INDEX_TIMEOUT))
    }

    fn ok_index() -> Result<(u16, String), ApiError> {
        Ok((200, INDEX_BODY.to_string()))
    }

    #[tokio::test]
    async fn fresh_loader_reports_nothing() {
        let fetch = Arc::new(ScriptedFetch::new(vec![]));
        let loader = loader_with(fetch.clone());

        assert!(!loader.is_cached());
        assert!(!loader.is_loading());
        assert_eq!(loader.stage(), None);
        assert_eq!(loader.progress_text(), None);
        assert_eq!(fetch.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_download() {
        let fetch = Arc::new(
            ScriptedFetch::new(vec![ok_index()]).with_delay(Duration::from_millis(50)),
        );
        let loader = loader_with(fetch.clone());

        let mut handles = Vec::new();
        for _ in 0..3 {
            let loader = Arc::clone(&loader);
            handles.push(tokio::spawn(async move { loader.get().await }));
        }

        let mut indexes = Vec::new();
        for handle in handles {
            indexes.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(fetch.call_count(), 1, "exactly one download must happen");
        assert!(Arc::ptr_eq(&indexes[0], &indexes[1]));
        assert!(Arc::ptr_eq(&indexes[1], &indexes[2]));
        assert_eq!(indexes[0].len(), 3);
    }

    #[tokio::test]
    async fn cached_index_issues_no_further_requests() {
        let fetch = Arc::new(ScriptedFetch::new(vec![ok_index()]));
        let loader = loader_with(fetch.clone());

        let first = loader.get().await.unwrap();
        let second = loader.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetch.call_count(), 1);
        assert!(loader.is_cached());
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn failed_load_resets_state_and_allows_retry() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            Err(ApiError::network("connection refused")),
            ok_index(),
        ]));
        let loader = loader_with(fetch.clone());

        let err = loader.get().await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
        assert!(!loader.is_cached());
        assert!(!loader.is_loading());
        assert_eq!(loader.progress_text(), None);

        let index = loader.get().await.unwrap();
        assert_eq!(index.name_of("1"), Some("Alpha"));
        assert_eq!(fetch.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_observe_the_shared_failure() {
        let fetch = Arc::new(
            ScriptedFetch::new(vec![Err(ApiError::Timeout)])
                .with_delay(Duration::from_millis(50)),
        );
        let loader = loader_with(fetch.clone());

        let a = tokio::spawn({
            let loader = Arc::clone(&loader);
            async move { loader.get().await }
        });
        let b = tokio::spawn({
            let loader = Arc::clone(&loader);
            async move { loader.get().await }
        });

        assert_eq!(a.await.unwrap().unwrap_err(), ApiError::Timeout);
        assert_eq!(b.await.unwrap().unwrap_err(), ApiError::Timeout);
        assert_eq!(fetch.call_count(), 1);
        assert!(!loader.is_cached());
    }

    #[tokio::test]
    async fn malformed_body_fails_and_resets() {
        let fetch = Arc::new(ScriptedFetch::new(vec![Ok((200, "not json".to_string()))]));
        let loader = loader_with(fetch);

        let err = loader.get().await.unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
        assert!(!loader.is_cached());
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn non_success_status_fails_with_that_status() {
        let fetch = Arc::new(ScriptedFetch::new(vec![Ok((503, String::new()))]));
        let loader = loader_with(fetch);

        let err = loader.get().await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Network {
                status: Some(503),
                message: "HTTP 503".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn clear_discards_the_cache_and_forces_a_refetch() {
        let fetch = Arc::new(ScriptedFetch::new(vec![ok_index(), ok_index()]));
        let loader = loader_with(fetch.clone());

        loader.get().await.unwrap();
        assert!(loader.is_cached());

        loader.clear();
        assert!(!loader.is_cached());

        loader.get().await.unwrap();
        assert_eq!(fetch.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn load_finishing_after_clear_does_not_repopulate() {
        let fetch = Arc::new(
            ScriptedFetch::new(vec![ok_index(), ok_index()])
                .with_delay(Duration::from_millis(50)),
        );
        let loader = loader_with(fetch.clone());

        let handle = tokio::spawn({
            let loader = Arc::clone(&loader);
            async move { loader.get().await }
        });

        // Let the leader reach its suspension point inside the fake fetch.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(loader.is_loading());

        loader.clear();

        // The attempt itself still completes for its caller.
        let index = handle.await.unwrap().unwrap();
        assert_eq!(index.len(), 3);

        // But the cleared cache stays cleared.
        assert!(!loader.is_cached());
        loader.get().await.unwrap();
        assert_eq!(fetch.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_visible_while_loading_and_gone_after() {
        let fetch = Arc::new(
            ScriptedFetch::new(vec![ok_index()]).with_delay(Duration::from_millis(50)),
        );
        let loader = loader_with(fetch);

        let handle = tokio::spawn({
            let loader = Arc::clone(&loader);
            async move { loader.get().await }
        });

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(loader.is_loading());
        assert_eq!(loader.stage(), Some(LoadStage::Connecting));
        assert_eq!(
            loader.progress_text().as_deref(),
            Some("Connecting to player database...")
        );

        handle.await.unwrap().unwrap();
        assert_eq!(loader.stage(), None);
        assert_eq!(loader.progress_text(), None);
    }

    #[tokio::test]
    async fn preload_warms_the_cache_once() {
        let fetch = Arc::new(ScriptedFetch::new(vec![ok_index()]));
        let loader = loader_with(fetch.clone());

        loader.preload();
        // Drive the spawned load to completion on the test runtime.
        for _ in 0..50 {
            if loader.is_cached() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(loader.is_cached());
        assert_eq!(fetch.call_count(), 1);

        // Further preloads are no-ops.
        loader.preload();
        tokio::task::yield_now().await;
        assert_eq!(fetch.call_count(), 1);
    }

    #[tokio::test]
    async fn preload_swallows_errors_and_leaves_state_retryable() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            Err(ApiError::network("unreachable")),
            ok_index(),
        ]));
        let loader = loader_with(fetch.clone());

        loader.preload();
        for _ in 0..50 {
            if !loader.is_loading() && fetch.call_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!loader.is_cached());
        assert!(!loader.is_loading());

        // An explicit call afterwards retries and succeeds.
        let index = loader.get().await.unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(fetch.call_count(), 2);
    }
}
