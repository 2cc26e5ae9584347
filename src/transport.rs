//! HTTP access path shared by the index loader and the profile fetcher.
//!
//! A single raw-fetch port (`HttpFetch`) plus the relay fallback policy used
//! when the hosting environment cannot reach the profile service directly
//! (browser deployments are blocked by the service's cross-origin policy).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::form_urlencoded;

use crate::error::ApiError;

/// Client identifier sent with every direct request.
pub const USER_AGENT: &str = "TarkovStats/1.0";

pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// The body half of an exchange, left unread until the caller decides the
/// status is worth reading it for. Mirrors the headers/body split of the
/// underlying HTTP client so the loader can report download progress.
#[async_trait]
pub trait ResponseBody: Send + std::fmt::Debug {
    fn status(&self) -> u16;
    async fn text(self: Box<Self>) -> Result<String, ApiError>;
}

/// One raw GET attempt with a deadline. The production implementation wraps
/// `reqwest`; tests substitute scripted fakes.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Box<dyn ResponseBody>, ApiError>;
}

/// `reqwest`-backed fetcher used outside of tests.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ReqwestBody {
    response: reqwest::Response,
}

#[async_trait]
impl ResponseBody for ReqwestBody {
    fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    async fn text(self: Box<Self>) -> Result<String, ApiError> {
        self.response.text().await.map_err(map_reqwest_error)
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Box<dyn ResponseBody>, ApiError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(Box::new(ReqwestBody { response }))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// A named relay that forwards a request to a target URL and returns its
/// response verbatim. The rewrite is a pure transform so the fallback order
/// stays declarative and independently testable.
#[derive(Clone, Copy)]
pub struct RelayEndpoint {
    pub name: &'static str,
    rewrite: fn(&str) -> String,
}

impl RelayEndpoint {
    /// Wraps `url` into this relay's forwarding form.
    pub fn wrap(&self, url: &str) -> String {
        (self.rewrite)(url)
    }
}

fn encode_target(url: &str) -> String {
    form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

/// Public relays, tried in declaration order when direct access fails.
pub const RELAY_ENDPOINTS: &[RelayEndpoint] = &[
    RelayEndpoint {
        name: "corsproxy.io",
        rewrite: |url| format!("https://corsproxy.io/?{}", encode_target(url)),
    },
    RelayEndpoint {
        name: "allorigins.win",
        rewrite: |url| format!("https://api.allorigins.win/raw?url={}", encode_target(url)),
    },
    RelayEndpoint {
        name: "codetabs.com",
        rewrite: |url| format!("https://api.codetabs.com/v1/proxy?quest={}", encode_target(url)),
    },
];

/// How outbound requests reach the profile service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Unrestricted outbound networking: issue the request directly.
    Direct,
    /// Cross-origin-restricted host: try direct first, then each relay in
    /// order, returning the first HTTP-success response.
    RelayFallback,
}

/// Issues GETs under the configured access policy. No retries beyond the
/// documented relay iteration, no backoff.
pub struct Transport {
    fetcher: Arc<dyn HttpFetch>,
    policy: AccessPolicy,
    relays: &'static [RelayEndpoint],
}

impl Transport {
    pub fn new(policy: AccessPolicy) -> Self {
        Self::with_fetcher(Arc::new(ReqwestFetch::new()), policy)
    }

    pub fn with_fetcher(fetcher: Arc<dyn HttpFetch>, policy: AccessPolicy) -> Self {
        Self {
            fetcher,
            policy,
            relays: RELAY_ENDPOINTS,
        }
    }

    /// GET `url` with `timeout` applied per attempt. Non-success responses are
    /// returned to the caller under `Direct` so it can interpret the status
    /// (e.g. a profile 404); under `RelayFallback` they trigger the fallback
    /// chain instead.
    pub async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Box<dyn ResponseBody>, ApiError> {
        match self.policy {
            AccessPolicy::Direct => self.fetcher.get(url, timeout).await,
            AccessPolicy::RelayFallback => {
                match self.fetcher.get(url, timeout).await {
                    Ok(response) if is_success(response.status()) => return Ok(response),
                    Ok(response) => {
                        tracing::debug!(
                            status = response.status(),
                            "direct fetch rejected, trying relays"
                        );
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "direct fetch failed, trying relays");
                    }
                }
                self.get_via_relays(url, timeout).await
            }
        }
    }

    async fn get_via_relays(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Box<dyn ResponseBody>, ApiError> {
        let mut last_error = ApiError::network("no relay endpoints configured");
        for relay in self.relays {
            let wrapped = relay.wrap(url);
            tracing::debug!(relay = relay.name, "trying relay");
            match self.fetcher.get(&wrapped, timeout).await {
                Ok(response) if is_success(response.status()) => {
                    tracing::debug!(relay = relay.name, "relay succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    last_error = ApiError::Network {
                        status: Some(response.status()),
                        message: format!(
                            "relay {} returned HTTP {}",
                            relay.name,
                            response.status()
                        ),
                    };
                }
                Err(err) => {
                    tracing::debug!(relay = relay.name, error = %err, "relay failed");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}
