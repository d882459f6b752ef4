//! npm package metadata and download counts

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::{optional_part, EnrichResult, Enricher, EnricherContext};
use crate::domain::{NpmData, RegistryType, ServerRecord, SourceData, SourceKind};

#[derive(Debug, Deserialize)]
struct PackumentResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    time: HashMap<String, String>,
    #[serde(default)]
    maintainers: Vec<Maintainer>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Maintainer {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DownloadPoint {
    downloads: u64,
}

pub struct NpmEnricher {
    ctx: EnricherContext,
}

impl NpmEnricher {
    pub fn new(ctx: EnricherContext) -> Self {
        Self { ctx }
    }

    fn package_name(record: &ServerRecord) -> Option<&str> {
        record
            .package_for(RegistryType::Npm)
            .map(|p| p.identifier.trim())
            .filter(|id| !id.is_empty())
    }

    async fn downloads(&self, period: &str, name: &str) -> Option<u64> {
        let url = format!(
            "{}/downloads/point/{}/{}",
            self.ctx.endpoints.npm_downloads, period, name
        );
        let result = self
            .ctx
            .get_json::<DownloadPoint>(self.kind(), &url, &HeaderMap::new())
            .await;
        optional_part(self.kind(), "download counts", result).map(|p| p.downloads)
    }
}

#[async_trait]
impl Enricher for NpmEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Npm
    }

    fn applies_to(&self, record: &ServerRecord) -> bool {
        Self::package_name(record).is_some()
    }

    async fn enrich(&self, record: &ServerRecord) -> EnrichResult {
        let Some(name) = Self::package_name(record) else {
            return Ok(None);
        };

        // Scoped names need the slash escaped for the registry document
        let packument_url = format!(
            "{}/{}",
            self.ctx.endpoints.npm_registry,
            name.replace('/', "%2F")
        );
        let headers = HeaderMap::new();
        let packument = self
            .ctx
            .get_json::<PackumentResponse>(self.kind(), &packument_url, &headers);

        let (packument, monthly, weekly) = tokio::join!(
            packument,
            self.downloads("last-month", name),
            self.downloads("last-week", name),
        );

        let Some(packument) = packument? else {
            return Ok(None);
        };

        let latest_version = packument.dist_tags.get("latest").cloned();
        let published_at = latest_version
            .as_ref()
            .and_then(|v| packument.time.get(v))
            .or_else(|| packument.time.get("modified"))
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Some(SourceData::Npm(NpmData {
            monthly_downloads: monthly,
            weekly_downloads: weekly,
            latest_version,
            published_at,
            maintainers: packument.maintainers.into_iter().map(|m| m.name).collect(),
            keywords: packument.keywords,
            homepage: packument.homepage.filter(|h| !h.is_empty()),
        })))
    }
}
