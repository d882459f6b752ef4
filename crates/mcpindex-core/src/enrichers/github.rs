//! GitHub repository metadata

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::{EnrichResult, Enricher, EnricherContext};
use crate::domain::{GithubData, ServerRecord, SourceData, SourceKind};

lazy_static! {
    // https://github.com/o/r(.git), git+https://..., ssh://git@github.com/o/r,
    // git@github.com:o/r.git, github.com/o/r/tree/main/sub
    static ref GITHUB_REPO_REGEX: Regex = Regex::new(
        r"^(?:git\+)?(?:(?:https?|ssh|git)://)?(?:git@)?(?:www\.)?github\.com[:/]([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?(?:[/#?].*)?$"
    )
    .unwrap();
}

/// Extract `(owner, repo)` from any of the GitHub URL shapes seen in the registry.
pub fn parse_github_repo(url: &str) -> Option<(String, String)> {
    let caps = GITHUB_REPO_REGEX.captures(url.trim())?;
    let owner = caps.get(1)?.as_str();
    let repo = caps.get(2)?.as_str();
    if repo.is_empty() || repo == "." || repo == ".." {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    watchers_count: u64,
    #[serde(default)]
    subscribers_count: Option<u64>,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    license: Option<LicenseInfo>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    owner: Option<OwnerInfo>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    spdx_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerInfo {
    login: String,
}

impl From<RepoResponse> for GithubData {
    fn from(repo: RepoResponse) -> Self {
        let license = repo.license.and_then(|l| match l.spdx_id {
            Some(id) if id != "NOASSERTION" => Some(id),
            _ => l.name,
        });

        GithubData {
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            watchers: repo.subscribers_count.unwrap_or(repo.watchers_count),
            last_commit: repo.pushed_at,
            license,
            topics: repo.topics,
            language: repo.language,
            owner: repo.owner.map(|o| o.login),
            archived: repo.archived,
            default_branch: repo.default_branch,
        }
    }
}

pub struct GithubEnricher {
    ctx: EnricherContext,
}

impl GithubEnricher {
    pub fn new(ctx: EnricherContext) -> Self {
        Self { ctx }
    }

    fn repo_of(record: &ServerRecord) -> Option<(String, String)> {
        record
            .repository
            .as_ref()
            .and_then(|r| parse_github_repo(&r.url))
    }
}

#[async_trait]
impl Enricher for GithubEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Github
    }

    fn applies_to(&self, record: &ServerRecord) -> bool {
        Self::repo_of(record).is_some()
    }

    async fn enrich(&self, record: &ServerRecord) -> EnrichResult {
        let Some((owner, repo)) = Self::repo_of(record) else {
            return Ok(None);
        };

        let url = format!("{}/repos/{}/{}", self.ctx.endpoints.github_api, owner, repo);
        let headers = self.ctx.github_headers();
        let repo = self
            .ctx
            .get_json::<RepoResponse>(self.kind(), &url, &headers)
            .await?;

        Ok(repo.map(|r| SourceData::Github(r.into())))
    }
}
