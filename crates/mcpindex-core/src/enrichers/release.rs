//! Release-asset metadata for MCP bundle (mcpb) packages.
//!
//! An mcpb identifier points somewhere inside a GitHub or GitLab release.
//! The known URL shapes are tried in a fixed order; the first match decides
//! which release API is queried.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;

use super::platform::detect_platforms;
use super::{EnrichResult, Enricher, EnricherContext};
use crate::domain::{RegistryType, ReleaseData, ServerRecord, SourceData, SourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseProvider {
    Github { owner: String, repo: String },
    Gitlab { project: String },
}

/// Where a bundle's release lives. `tag: None` means "latest release".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    pub provider: ReleaseProvider,
    pub tag: Option<String>,
}

type ShapeFn = fn(&Captures) -> Option<ReleaseRef>;

fn github(caps: &Captures, tag: Option<usize>) -> Option<ReleaseRef> {
    Some(ReleaseRef {
        provider: ReleaseProvider::Github {
            owner: caps.get(1)?.as_str().to_string(),
            repo: caps.get(2)?.as_str().to_string(),
        },
        tag: match tag {
            Some(i) => Some(caps.get(i)?.as_str().to_string()),
            None => None,
        },
    })
}

fn gitlab(caps: &Captures) -> Option<ReleaseRef> {
    Some(ReleaseRef {
        provider: ReleaseProvider::Gitlab {
            project: caps.get(1)?.as_str().to_string(),
        },
        tag: Some(caps.get(2)?.as_str().to_string()),
    })
}

lazy_static! {
    /// Identifier shapes in priority order
    static ref RELEASE_SHAPES: Vec<(Regex, ShapeFn)> = vec![
        (
            Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/releases/download/([^/]+)/[^/]+$").unwrap(),
            (|c| github(c, Some(3))) as ShapeFn,
        ),
        (
            Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/releases/latest/download/[^/]+$").unwrap(),
            (|c| github(c, None)) as ShapeFn,
        ),
        (
            Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/releases/tag/([^/?#]+)/?$").unwrap(),
            (|c| github(c, Some(3))) as ShapeFn,
        ),
        (
            Regex::new(r"^https?://gitlab\.com/(.+?)/-/releases/([^/]+)/downloads/.+$").unwrap(),
            gitlab as ShapeFn,
        ),
        (
            Regex::new(r"^https?://gitlab\.com/(.+?)/-/releases/([^/?#]+)/?$").unwrap(),
            gitlab as ShapeFn,
        ),
    ];
}

/// Match an mcpb identifier against the known release URL shapes.
pub fn parse_release_ref(identifier: &str) -> Option<ReleaseRef> {
    let identifier = identifier.trim();
    RELEASE_SHAPES.iter().find_map(|(re, build)| {
        let caps = re.captures(identifier)?;
        build(&caps)
    })
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    html_url: String,
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    download_count: u64,
}

#[derive(Debug, Deserialize)]
struct GitlabRelease {
    tag_name: String,
    #[serde(default)]
    released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    upcoming_release: bool,
    #[serde(default, rename = "_links")]
    links: Option<GitlabReleaseLinks>,
    #[serde(default)]
    assets: Option<GitlabAssets>,
}

#[derive(Debug, Deserialize)]
struct GitlabReleaseLinks {
    #[serde(rename = "self")]
    self_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitlabAssets {
    #[serde(default)]
    links: Vec<GitlabAssetLink>,
}

#[derive(Debug, Deserialize)]
struct GitlabAssetLink {
    name: String,
}

impl From<GithubRelease> for ReleaseData {
    fn from(release: GithubRelease) -> Self {
        let platforms = detect_platforms(release.assets.iter().map(|a| a.name.as_str()));
        ReleaseData {
            release_url: release.html_url,
            tag_name: release.tag_name,
            download_count: Some(release.assets.iter().map(|a| a.download_count).sum()),
            total_size: Some(release.assets.iter().map(|a| a.size).sum()),
            released_at: release.published_at,
            platforms,
            prerelease: release.prerelease,
        }
    }
}

impl GitlabRelease {
    fn into_release_data(self, project: &str) -> ReleaseData {
        let names: Vec<String> = self
            .assets
            .map(|a| a.links.into_iter().map(|l| l.name).collect())
            .unwrap_or_default();
        let release_url = self
            .links
            .and_then(|l| l.self_url)
            .unwrap_or_else(|| format!("https://gitlab.com/{}/-/releases/{}", project, self.tag_name));

        ReleaseData {
            release_url,
            tag_name: self.tag_name,
            download_count: None,
            total_size: None,
            released_at: self.released_at,
            platforms: detect_platforms(names.iter().map(String::as_str)),
            prerelease: self.upcoming_release,
        }
    }
}

pub struct ReleaseEnricher {
    ctx: EnricherContext,
}

impl ReleaseEnricher {
    pub fn new(ctx: EnricherContext) -> Self {
        Self { ctx }
    }

    fn release_of(record: &ServerRecord) -> Option<ReleaseRef> {
        record
            .packages
            .iter()
            .filter(|p| p.registry_type == RegistryType::Mcpb)
            .find_map(|p| parse_release_ref(&p.identifier))
    }

    async fn fetch_github(&self, owner: &str, repo: &str, tag: Option<&str>) -> EnrichResult {
        let base = format!("{}/repos/{}/{}/releases", self.ctx.endpoints.github_api, owner, repo);
        let url = match tag {
            Some(tag) => format!("{}/tags/{}", base, urlencoding::encode(tag)),
            None => format!("{}/latest", base),
        };
        let headers = self.ctx.github_headers();
        let release = self
            .ctx
            .get_json::<GithubRelease>(self.kind(), &url, &headers)
            .await?;
        Ok(release.map(|r| SourceData::Release(r.into())))
    }

    async fn fetch_gitlab(&self, project: &str, tag: Option<&str>) -> EnrichResult {
        let base = format!(
            "{}/projects/{}/releases",
            self.ctx.endpoints.gitlab_api,
            urlencoding::encode(project)
        );
        let url = match tag {
            Some(tag) => format!("{}/{}", base, urlencoding::encode(tag)),
            None => format!("{}/permalink/latest", base),
        };
        let headers = self.ctx.gitlab_headers();
        let release = self
            .ctx
            .get_json::<GitlabRelease>(self.kind(), &url, &headers)
            .await?;
        Ok(release.map(|r| SourceData::Release(r.into_release_data(project))))
    }
}

#[async_trait]
impl Enricher for ReleaseEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Release
    }

    fn applies_to(&self, record: &ServerRecord) -> bool {
        Self::release_of(record).is_some()
    }

    async fn enrich(&self, record: &ServerRecord) -> EnrichResult {
        let Some(release) = Self::release_of(record) else {
            return Ok(None);
        };

        match &release.provider {
            ReleaseProvider::Github { owner, repo } => {
                self.fetch_github(owner, repo, release.tag.as_deref()).await
            }
            ReleaseProvider::Gitlab { project } => {
                self.fetch_gitlab(project, release.tag.as_deref()).await
            }
        }
    }
}
