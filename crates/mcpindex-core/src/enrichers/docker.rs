//! Docker Hub repository metadata for OCI packages

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::debug;

use super::{optional_part, EnrichResult, Enricher, EnricherContext};
use crate::domain::{DockerData, RegistryType, ServerRecord, SourceData, SourceKind};

const DOCKER_HUB_HOSTS: &[&str] = &["docker.io", "index.docker.io", "registry-1.docker.io"];
const TAG_PAGE_SIZE: u32 = 10;

/// A Docker Hub repository reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImage {
    pub namespace: String,
    pub repository: String,
}

/// Parse an OCI identifier into a Docker Hub repository.
///
/// Returns `None` for images hosted on other registries (ghcr.io, quay.io, ...).
pub fn parse_docker_image(identifier: &str) -> Option<DockerImage> {
    let mut rest = identifier.trim();
    rest = rest.strip_prefix("docker://").unwrap_or(rest);

    // Digest and tag only ever follow the final path segment
    if let Some((before, _)) = rest.split_once('@') {
        rest = before;
    }
    let (path, last) = match rest.rsplit_once('/') {
        Some((path, last)) => (Some(path), last),
        None => (None, rest),
    };
    let last = last.split_once(':').map(|(name, _)| name).unwrap_or(last);

    let mut segments: Vec<&str> = path
        .map(|p| p.split('/').collect())
        .unwrap_or_default();
    segments.push(last);

    let first = segments[0];
    if segments.len() > 1 && (first.contains('.') || first.contains(':') || first == "localhost") {
        if !DOCKER_HUB_HOSTS.contains(&first) {
            return None;
        }
        segments.remove(0);
    }

    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    match segments.as_slice() {
        [repo] => Some(DockerImage {
            namespace: "library".to_string(),
            repository: repo.to_string(),
        }),
        [ns, repo] => Some(DockerImage {
            namespace: ns.to_string(),
            repository: repo.to_string(),
        }),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    #[serde(default)]
    pull_count: u64,
    #[serde(default)]
    star_count: u64,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    is_automated: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

pub struct DockerEnricher {
    ctx: EnricherContext,
}

impl DockerEnricher {
    pub fn new(ctx: EnricherContext) -> Self {
        Self { ctx }
    }

    fn image_of(record: &ServerRecord) -> Option<DockerImage> {
        let package = record.package_for(RegistryType::Oci)?;
        let image = parse_docker_image(&package.identifier);
        if image.is_none() {
            debug!(
                name = %record.name,
                "[Enrich] OCI image {} is not on Docker Hub",
                package.identifier
            );
        }
        image
    }
}

#[async_trait]
impl Enricher for DockerEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Docker
    }

    fn applies_to(&self, record: &ServerRecord) -> bool {
        Self::image_of(record).is_some()
    }

    async fn enrich(&self, record: &ServerRecord) -> EnrichResult {
        let Some(image) = Self::image_of(record) else {
            return Ok(None);
        };

        let repo_url = format!(
            "{}/v2/repositories/{}/{}/",
            self.ctx.endpoints.docker_hub, image.namespace, image.repository
        );
        let tags_url = format!(
            "{}tags/?page_size={}&ordering=last_updated",
            repo_url, TAG_PAGE_SIZE
        );
        let headers = HeaderMap::new();

        let (repo, tags) = tokio::join!(
            self.ctx
                .get_json::<RepositoryResponse>(self.kind(), &repo_url, &headers),
            self.ctx.get_json::<TagsResponse>(self.kind(), &tags_url, &headers),
        );

        let Some(repo) = repo? else {
            return Ok(None);
        };
        let tags = optional_part(self.kind(), "tag list", tags)
            .map(|t| t.results.into_iter().map(|e| e.name).collect())
            .unwrap_or_default();

        Ok(Some(SourceData::Docker(DockerData {
            pull_count: repo.pull_count,
            star_count: repo.star_count,
            last_updated: repo.last_updated,
            tags,
            is_official: image.namespace == "library",
            is_automated: repo.is_automated,
        })))
    }
}
