//! Source enrichers
//!
//! One [`Enricher`] per external metadata provider. Each one finds its own
//! identifier on a record, fetches from its API, and returns a
//! [`SourceData`] for its slot, or nothing.
//!
//! Outcomes:
//! - no identifier on the record: `applies_to` is false, no network call
//! - 404: `Ok(None)`, logged at info
//! - rate limited: `Ok(None)`, logged as a warning
//! - anything else: `Err(EnrichError)`; the coordinator logs it and treats
//!   the slot as absent

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::domain::{ServerRecord, SourceCredentials, SourceData, SourceEndpoints, SourceKind};
use crate::service::resilient_fetch::{FetchError, HttpFetcher};

mod docker;
mod github;
mod npm;
mod nuget;
pub mod platform;
mod pypi;
mod release;

pub use docker::{parse_docker_image, DockerEnricher, DockerImage};
pub use github::{parse_github_repo, GithubEnricher};
pub use npm::NpmEnricher;
pub use nuget::NugetEnricher;
pub use platform::detect_platform;
pub use pypi::PypiEnricher;
pub use release::{parse_release_ref, ReleaseEnricher, ReleaseProvider, ReleaseRef};

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

pub type EnrichResult = Result<Option<SourceData>, EnrichError>;

/// A single external metadata source.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Which enrichment slot this source fills
    fn kind(&self) -> SourceKind;

    /// Whether the record carries an identifier this source understands.
    /// Must not touch the network.
    fn applies_to(&self, record: &ServerRecord) -> bool;

    /// Fetch and normalize this source's data for `record`.
    async fn enrich(&self, record: &ServerRecord) -> EnrichResult;
}

/// Everything an enricher needs to reach its API
#[derive(Clone)]
pub struct EnricherContext {
    pub fetcher: HttpFetcher,
    pub endpoints: SourceEndpoints,
    pub credentials: SourceCredentials,
}

impl EnricherContext {
    pub fn new(
        fetcher: HttpFetcher,
        endpoints: SourceEndpoints,
        credentials: SourceCredentials,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            credentials,
        }
    }

    pub(crate) fn github_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = &self.credentials.github_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        headers
    }

    pub(crate) fn gitlab_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.credentials.gitlab_token {
            if let Ok(value) = HeaderValue::from_str(token) {
                headers.insert("private-token", value);
            }
        }
        headers
    }

    /// GET `url` and decode JSON, folding 404 and rate limits into `Ok(None)`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        kind: SourceKind,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Option<T>, EnrichError> {
        let response = self.fetcher.get_with_headers(url, headers).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            info!(source = %kind, "[Enrich] Not found: {}", url);
            return Ok(None);
        }

        if is_rate_limited(status, response.headers()) {
            warn!(source = %kind, "[Enrich] Rate limited by {} (HTTP {})", url, status);
            return Ok(None);
        }

        if !status.is_success() {
            return Err(EnrichError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<T>()
            .map(Some)
            .map_err(|e| EnrichError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// HTTP 429, or 403 with an exhausted `x-ratelimit-remaining`.
pub fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN
        && headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
}

/// Result of a secondary sub-call: failures degrade to `None`.
pub(crate) fn optional_part<T>(
    kind: SourceKind,
    what: &str,
    result: Result<Option<T>, EnrichError>,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(source = %kind, "[Enrich] {} unavailable: {}", what, e);
            None
        }
    }
}

/// All built-in enrichers in the order the coordinator runs them.
pub fn default_enrichers(ctx: EnricherContext) -> Vec<Arc<dyn Enricher>> {
    vec![
        Arc::new(GithubEnricher::new(ctx.clone())),
        Arc::new(NpmEnricher::new(ctx.clone())),
        Arc::new(PypiEnricher::new(ctx.clone())),
        Arc::new(NugetEnricher::new(ctx.clone())),
        Arc::new(DockerEnricher::new(ctx.clone())),
        Arc::new(ReleaseEnricher::new(ctx)),
    ]
}
