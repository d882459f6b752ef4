//! HTTP client for listing servers from the upstream MCP registry.
//!
//! Pages through `GET {base}/servers` with a cursor until the registry stops
//! returning one. Only entries flagged as the latest version are kept.
//! The registry is the source of truth: any non-success response fails the
//! whole listing.

use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::registry::{ServerEntry, ServerListResponse};
use crate::service::resilient_fetch::HttpFetcher;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Client for the MCP registry's paginated server listing
pub struct RegistryApiClient {
    base_url: String,
    fetcher: HttpFetcher,
    page_size: u32,
    page_delay: Duration,
}

impl RegistryApiClient {
    /// Create a new Registry API client
    pub fn new(base_url: impl Into<String>, fetcher: HttpFetcher) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fetcher,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List every current server in the registry
    pub async fn fetch_all_servers(&self) -> Result<Vec<ServerEntry>> {
        info!("[Registry] Fetching all servers from {}", self.base_url);
        self.fetch_paginated(None).await
    }

    /// List servers updated at or after `since`
    pub async fn fetch_updated_servers(&self, since: DateTime<Utc>) -> Result<Vec<ServerEntry>> {
        info!(
            "[Registry] Fetching servers updated since {} from {}",
            since, self.base_url
        );
        self.fetch_paginated(Some(since)).await
    }

    async fn fetch_paginated(&self, since: Option<DateTime<Utc>>) -> Result<Vec<ServerEntry>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let url = self.page_url(cursor.as_deref(), since)?;
            let page = self.fetch_page(&url).await?;
            pages += 1;

            let received = page.servers.len();
            let latest: Vec<ServerEntry> =
                page.servers.into_iter().filter(|e| e.is_latest()).collect();
            debug!(
                page = pages,
                received,
                kept = latest.len(),
                "[Registry] Page fetched"
            );
            entries.extend(latest);

            match page.metadata.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            "[Registry] Fetched {} latest-version servers across {} pages",
            entries.len(),
            pages
        );
        Ok(entries)
    }

    fn page_url(&self, cursor: Option<&str>, since: Option<DateTime<Utc>>) -> Result<String> {
        let mut url = url::Url::parse(&format!("{}/servers", self.base_url))
            .with_context(|| format!("Invalid registry URL: {}", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
            if let Some(since) = since {
                query.append_pair(
                    "updated_since",
                    &since.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }
        }
        Ok(url.to_string())
    }

    async fn fetch_page(&self, url: &str) -> Result<ServerListResponse> {
        let response = self
            .fetcher
            .get(url)
            .await
            .context("Failed to send request to registry API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Registry API returned status {} for {}", status, url);
        }

        response
            .json::<ServerListResponse>()
            .context("Failed to parse registry server list JSON")
    }
}
