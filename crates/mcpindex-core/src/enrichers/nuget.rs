//! NuGet package metadata via the search service

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::info;

use super::{EnrichResult, Enricher, EnricherContext};
use crate::domain::{NugetData, RegistryType, ServerRecord, SourceData, SourceKind};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    total_downloads: u64,
    #[serde(default)]
    authors: Option<OneOrMany>,
    #[serde(default)]
    tags: Option<OneOrMany>,
    #[serde(default)]
    project_url: Option<String>,
    #[serde(default)]
    verified: bool,
}

/// The search service returns some list fields as either a string or an array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn into_vec(value: Option<OneOrMany>) -> Vec<String> {
    match value {
        Some(OneOrMany::One(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    }
}

pub struct NugetEnricher {
    ctx: EnricherContext,
}

impl NugetEnricher {
    pub fn new(ctx: EnricherContext) -> Self {
        Self { ctx }
    }

    fn package_id(record: &ServerRecord) -> Option<&str> {
        record
            .package_for(RegistryType::Nuget)
            .map(|p| p.identifier.trim())
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
impl Enricher for NugetEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Nuget
    }

    fn applies_to(&self, record: &ServerRecord) -> bool {
        Self::package_id(record).is_some()
    }

    async fn enrich(&self, record: &ServerRecord) -> EnrichResult {
        let Some(id) = Self::package_id(record) else {
            return Ok(None);
        };

        let url = format!(
            "{}/query?q=packageid:{}&take=1&prerelease=true",
            self.ctx.endpoints.nuget_search,
            urlencoding::encode(id)
        );
        let Some(response) = self
            .ctx
            .get_json::<SearchResponse>(self.kind(), &url, &HeaderMap::new())
            .await?
        else {
            return Ok(None);
        };

        let Some(hit) = response
            .data
            .into_iter()
            .find(|h| h.id.eq_ignore_ascii_case(id))
        else {
            info!(source = %self.kind(), "[Enrich] No NuGet package named {}", id);
            return Ok(None);
        };

        Ok(Some(SourceData::Nuget(NugetData {
            total_downloads: hit.total_downloads,
            latest_version: hit.version,
            authors: into_vec(hit.authors),
            keywords: into_vec(hit.tags),
            homepage: hit.project_url.filter(|u| !u.is_empty()),
            verified: hit.verified,
        })))
    }
}
