//! Per-source enrichment data attached to a server record.
//!
//! Every source owns exactly one optional slot. A missing slot means the
//! source did not apply or had nothing to say on the last run that touched
//! it; it never means "zero".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External metadata providers, in the order the coordinator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Github,
    Npm,
    Pypi,
    Nuget,
    Docker,
    Release,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Github => "github",
            SourceKind::Npm => "npm",
            SourceKind::Pypi => "pypi",
            SourceKind::Nuget => "nuget",
            SourceKind::Docker => "docker",
            SourceKind::Release => "release",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_enriched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<NpmData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pypi: Option<PypiData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nuget: Option<NugetData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseData>,
}

impl Enrichment {
    /// Overwrite the slot owned by `data`'s source, leaving every other slot alone.
    pub fn apply(&mut self, data: SourceData) {
        match data {
            SourceData::Github(d) => self.github = Some(d),
            SourceData::Npm(d) => self.npm = Some(d),
            SourceData::Pypi(d) => self.pypi = Some(d),
            SourceData::Nuget(d) => self.nuget = Some(d),
            SourceData::Docker(d) => self.docker = Some(d),
            SourceData::Release(d) => self.release = Some(d),
        }
    }

    /// Sources whose slot currently holds data, in run order.
    pub fn sources(&self) -> Vec<SourceKind> {
        [
            (SourceKind::Github, self.github.is_some()),
            (SourceKind::Npm, self.npm.is_some()),
            (SourceKind::Pypi, self.pypi.is_some()),
            (SourceKind::Nuget, self.nuget.is_some()),
            (SourceKind::Docker, self.docker.is_some()),
            (SourceKind::Release, self.release.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, present)| present.then_some(kind))
        .collect()
    }

    /// Whether enrichment is younger than `max_age` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        match self.last_enriched_at {
            Some(at) => now - at < max_age,
            None => false,
        }
    }

    /// Sum of every download figure present, absent sources counting as zero.
    pub fn total_downloads(&self) -> u64 {
        let npm = self.npm.as_ref().and_then(|d| d.monthly_downloads);
        let pypi = self.pypi.as_ref().and_then(|d| d.monthly_downloads);
        let nuget = self.nuget.as_ref().map(|d| d.total_downloads);
        let docker = self.docker.as_ref().map(|d| d.pull_count);
        let release = self.release.as_ref().and_then(|d| d.download_count);

        [npm, pypi, nuget, docker, release]
            .into_iter()
            .flatten()
            .fold(0u64, u64::saturating_add)
    }
}

/// A single enricher's contribution, tagged with the slot it fills.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData {
    Github(GithubData),
    Npm(NpmData),
    Pypi(PypiData),
    Nuget(NugetData),
    Docker(DockerData),
    Release(ReleaseData),
}

impl SourceData {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceData::Github(_) => SourceKind::Github,
            SourceData::Npm(_) => SourceKind::Npm,
            SourceData::Pypi(_) => SourceKind::Pypi,
            SourceData::Nuget(_) => SourceKind::Nuget,
            SourceData::Docker(_) => SourceKind::Docker,
            SourceData::Release(_) => SourceKind::Release,
        }
    }
}

/// Source-control repository metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubData {
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PypiData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NugetData {
    pub total_downloads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// Container-registry repository metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerData {
    pub pull_count: u64,
    pub star_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub is_automated: bool,
}

/// Release-asset metadata (GitHub or GitLab releases).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseData {
    pub release_url: String,
    pub tag_name: String,
    /// Summed asset downloads; GitLab doesn't report counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_count: Option<u64>,
    /// Summed asset size in bytes; GitLab doesn't report sizes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub prerelease: bool,
}
