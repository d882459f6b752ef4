//! HTTP fetching with progressive timeouts and linear backoff.
//!
//! Only network-level failures are retried. Any HTTP response that actually
//! arrives (including 404, 403 and 5xx) is handed back to the caller as-is.
//! The body is read inside the attempt, so a response that stalls after its
//! headers is cancelled and retried like any other slow request.

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::RetryPolicy;

const USER_AGENT: &str = concat!("mcpindex/", env!("CARGO_PKG_VERSION"));

/// Closed classification of network failures. Retry decisions branch on this
/// and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    ConnReset,
    ConnRefused,
    /// Cancelled because the attempt exceeded its timeout
    Aborted,
    GenericFetchFailure,
    Other,
}

impl NetworkErrorKind {
    pub fn is_retriable(&self) -> bool {
        !matches!(self, NetworkErrorKind::Other)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            kind: classify_reqwest_error(&err),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: NetworkError,
    },

    #[error("request to {url} failed: {error}")]
    Terminal {
        url: String,
        #[source]
        error: NetworkError,
    },
}

impl FetchError {
    pub fn kind(&self) -> NetworkErrorKind {
        match self {
            FetchError::Exhausted { last, .. } => last.kind,
            FetchError::Terminal { error, .. } => error.kind,
        }
    }
}

/// Map a reqwest failure onto [`NetworkErrorKind`].
pub fn classify_reqwest_error(err: &reqwest::Error) -> NetworkErrorKind {
    if err.is_timeout() {
        return NetworkErrorKind::Timeout;
    }
    // Checked first so a reset while reading the body stays retriable
    match io_error_kind(err) {
        Some(std::io::ErrorKind::ConnectionRefused) => return NetworkErrorKind::ConnRefused,
        Some(std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted) => {
            return NetworkErrorKind::ConnReset;
        }
        Some(std::io::ErrorKind::TimedOut) => return NetworkErrorKind::Timeout,
        _ => {}
    }
    if err.is_builder() || err.is_redirect() || err.is_decode() || err.is_status() {
        return NetworkErrorKind::Other;
    }
    NetworkErrorKind::GenericFetchFailure
}

/// First `io::Error` in the source chain, if any.
fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        current = e.source();
    }
    None
}

/// Run `attempt` until it succeeds, fails terminally, or the policy runs out.
///
/// Attempt `i` is given `policy.timeout_for(i)`; exceeding it cancels the
/// attempt's future and counts as [`NetworkErrorKind::Aborted`]. After a
/// retriable failure the task sleeps `policy.backoff_for(i)`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, NetworkError>>,
{
    let max_attempts = policy.max_retries.max(1);

    for n in 1..=max_attempts {
        let timeout = policy.timeout_for(n);
        let error = match tokio::time::timeout(timeout, attempt(n)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => NetworkError::new(
                NetworkErrorKind::Aborted,
                format!("no response within {}ms", timeout.as_millis()),
            ),
        };

        if !error.kind.is_retriable() {
            return Err(FetchError::Terminal {
                url: url.to_string(),
                error,
            });
        }

        if n == max_attempts {
            return Err(FetchError::Exhausted {
                url: url.to_string(),
                attempts: n,
                last: error,
            });
        }

        let backoff = policy.backoff_for(n);
        warn!(
            attempt = n,
            max_attempts,
            backoff_ms = backoff.as_millis() as u64,
            "[Fetch] {} failed ({}), retrying",
            url,
            error
        );
        tokio::time::sleep(backoff).await;
    }

    // max_attempts >= 1, so the loop always returns
    Err(FetchError::Terminal {
        url: url.to_string(),
        error: NetworkError::new(NetworkErrorKind::Other, "no attempts made"),
    })
}

/// A fully received HTTP response
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl FetchedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// GET `url` with `headers`, retrying network failures per `policy`.
///
/// Each attempt covers the whole exchange, headers and body.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    policy: &RetryPolicy,
) -> Result<FetchedResponse, FetchError> {
    retry_with_backoff(policy, url, |n| {
        debug!(attempt = n, "[Fetch] GET {}", url);
        let request = client.get(url).headers(headers.clone());
        async move {
            let response = request.send().await.map_err(NetworkError::from)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(NetworkError::from)?;
            Ok::<_, NetworkError>(FetchedResponse::new(status, headers, body.to_vec()))
        }
    })
    .await
}

/// Shared HTTP client plus retry policy, cheap to clone.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Create a fetcher with the default HTTP client
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, policy })
    }

    /// Create with a custom HTTP client (useful for testing)
    pub fn with_client(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        fetch_with_retry(&self.client, url, &HeaderMap::new(), &self.policy).await
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<FetchedResponse, FetchError> {
        fetch_with_retry(&self.client, url, headers, &self.policy).await
    }
}
