//! PyPI project metadata and pypistats download counts

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::{optional_part, EnrichResult, Enricher, EnricherContext};
use crate::domain::{PypiData, RegistryType, ServerRecord, SourceData, SourceKind};

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    info: ProjectInfo,
    #[serde(default)]
    urls: Vec<ReleaseFile>,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    maintainer: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    home_page: Option<String>,
    #[serde(default)]
    project_urls: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    upload_time_iso_8601: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RecentResponse {
    data: RecentDownloads,
}

#[derive(Debug, Deserialize)]
struct RecentDownloads {
    #[serde(default)]
    last_week: Option<u64>,
    #[serde(default)]
    last_month: Option<u64>,
}

/// PyPI keywords come as one string, comma- or space-separated.
fn split_keywords(raw: &str) -> Vec<String> {
    let separator: &[char] = if raw.contains(',') { &[','] } else { &[' '] };
    raw.split(separator)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn people(info: &ProjectInfo) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for field in [&info.author, &info.maintainer].into_iter().flatten() {
        for name in field.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !out.iter().any(|existing| existing == name) {
                out.push(name.to_string());
            }
        }
    }
    out
}

fn homepage(info: &ProjectInfo) -> Option<String> {
    let from_urls = info.project_urls.as_ref().and_then(|urls| {
        ["Homepage", "homepage", "Home", "Documentation", "Source"]
            .iter()
            .find_map(|key| urls.get(*key).cloned())
    });
    info.home_page
        .clone()
        .filter(|h| !h.is_empty())
        .or(from_urls)
}

pub struct PypiEnricher {
    ctx: EnricherContext,
}

impl PypiEnricher {
    pub fn new(ctx: EnricherContext) -> Self {
        Self { ctx }
    }

    fn package_name(record: &ServerRecord) -> Option<&str> {
        record
            .package_for(RegistryType::Pypi)
            .map(|p| p.identifier.trim())
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
impl Enricher for PypiEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Pypi
    }

    fn applies_to(&self, record: &ServerRecord) -> bool {
        Self::package_name(record).is_some()
    }

    async fn enrich(&self, record: &ServerRecord) -> EnrichResult {
        let Some(name) = Self::package_name(record) else {
            return Ok(None);
        };

        let project_url = format!("{}/pypi/{}/json", self.ctx.endpoints.pypi, name);
        let stats_url = format!(
            "{}/api/packages/{}/recent",
            self.ctx.endpoints.pypistats,
            name.to_lowercase()
        );
        let headers = HeaderMap::new();

        let (project, recent) = tokio::join!(
            self.ctx
                .get_json::<ProjectResponse>(self.kind(), &project_url, &headers),
            self.ctx
                .get_json::<RecentResponse>(self.kind(), &stats_url, &headers),
        );

        let Some(project) = project? else {
            return Ok(None);
        };
        let recent = optional_part(self.kind(), "download counts", recent);

        let published_at = project
            .urls
            .iter()
            .filter_map(|f| f.upload_time_iso_8601)
            .max();

        Ok(Some(SourceData::Pypi(PypiData {
            monthly_downloads: recent.as_ref().and_then(|r| r.data.last_month),
            weekly_downloads: recent.as_ref().and_then(|r| r.data.last_week),
            latest_version: project.info.version.clone(),
            published_at,
            authors: people(&project.info),
            keywords: project
                .info
                .keywords
                .as_deref()
                .map(split_keywords)
                .unwrap_or_default(),
            homepage: homepage(&project.info),
        })))
    }
}
