//! Run configuration.
//!
//! Built once per process (normally from the environment) and passed down
//! explicitly to the orchestrator, coordinator and enrichers.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names understood by [`SyncConfig::from_lookup`].
pub mod env_keys {
    pub const DATA_DIR: &str = "MCPINDEX_DATA_DIR";
    pub const REGISTRY_URL: &str = "MCPINDEX_REGISTRY_URL";
    pub const FULL_SYNC: &str = "FULL_SYNC";
    pub const ENRICH_CONCURRENCY: &str = "ENRICH_CONCURRENCY";
    pub const ENRICH_DELAY_MS: &str = "ENRICH_DELAY_MS";
    pub const ENRICH_MAX_AGE_HOURS: &str = "ENRICH_MAX_AGE_HOURS";
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const GITLAB_TOKEN: &str = "GITLAB_TOKEN";
}

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.modelcontextprotocol.io/v0";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' is not a non-negative integer")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be at least 1")]
    ZeroConcurrency { key: &'static str },
}

/// Retry behaviour for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_retries: u32,
    /// Timeout of attempt 1; attempt `i` gets `base_timeout * i`
    pub base_timeout: Duration,
    /// Sleep after failed attempt `i` is `backoff_unit * i`
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_timeout: Duration::from_millis(10_000),
            backoff_unit: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout * attempt
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// Knobs for the enrichment coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    /// Maximum records enriched at once
    pub concurrency: usize,
    /// Pause between two source calls for one record
    pub delay: Duration,
    /// Records enriched more recently than this are skipped
    pub max_age: chrono::Duration,
    pub skip_if_fresh: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            delay: Duration::from_millis(500),
            max_age: chrono::Duration::hours(24),
            skip_if_fresh: true,
        }
    }
}

impl EnrichOptions {
    /// Gentler settings used by scheduled syncs to stay under source rate limits.
    pub fn for_sync() -> Self {
        Self {
            concurrency: 2,
            delay: Duration::from_millis(1_000),
            ..Self::default()
        }
    }

    /// Pause a worker takes between two records.
    pub fn worker_cooldown(&self) -> Duration {
        self.delay * 2
    }
}

/// Base URLs of every external source. Overridable so tests can point them
/// at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoints {
    pub github_api: String,
    pub gitlab_api: String,
    pub npm_registry: String,
    pub npm_downloads: String,
    pub pypi: String,
    pub pypistats: String,
    pub nuget_search: String,
    pub docker_hub: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            gitlab_api: "https://gitlab.com/api/v4".to_string(),
            npm_registry: "https://registry.npmjs.org".to_string(),
            npm_downloads: "https://api.npmjs.org".to_string(),
            pypi: "https://pypi.org".to_string(),
            pypistats: "https://pypistats.org".to_string(),
            nuget_search: "https://azuresearch-usnc.nuget.org".to_string(),
            docker_hub: "https://hub.docker.com".to_string(),
        }
    }
}

impl SourceEndpoints {
    /// Every source rooted at one base URL (for mock servers).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            github_api: base.to_string(),
            gitlab_api: base.to_string(),
            npm_registry: base.to_string(),
            npm_downloads: base.to_string(),
            pypi: base.to_string(),
            pypistats: base.to_string(),
            nuget_search: base.to_string(),
            docker_hub: base.to_string(),
        }
    }
}

/// Optional tokens that raise source rate limits.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SourceCredentials {
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
}

impl std::fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .field("gitlab_token", &self.gitlab_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding the snapshot and sync-state files
    pub data_dir: PathBuf,
    pub registry_url: String,
    pub force_full: bool,
    /// A full sync is forced once the last one is older than this
    pub full_sync_interval: chrono::Duration,
    pub page_size: u32,
    pub page_delay: Duration,
    pub enrich: EnrichOptions,
    pub endpoints: SourceEndpoints,
    pub credentials: SourceCredentials,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            force_full: false,
            full_sync_interval: chrono::Duration::days(7),
            page_size: 100,
            page_delay: Duration::from_millis(100),
            enrich: EnrichOptions::for_sync(),
            endpoints: SourceEndpoints::default(),
            credentials: SourceCredentials::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(env_keys::DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(env_keys::REGISTRY_URL) {
            config.registry_url = url.trim_end_matches('/').to_string();
        }
        if let Some(flag) = get(env_keys::FULL_SYNC) {
            config.force_full = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(raw) = get(env_keys::ENRICH_CONCURRENCY) {
            let n = parse_number(env_keys::ENRICH_CONCURRENCY, &raw)?;
            if n == 0 {
                return Err(ConfigError::ZeroConcurrency {
                    key: env_keys::ENRICH_CONCURRENCY,
                });
            }
            config.enrich.concurrency = n as usize;
        }
        if let Some(raw) = get(env_keys::ENRICH_DELAY_MS) {
            config.enrich.delay = Duration::from_millis(parse_number(env_keys::ENRICH_DELAY_MS, &raw)?);
        }
        if let Some(raw) = get(env_keys::ENRICH_MAX_AGE_HOURS) {
            let hours = parse_number(env_keys::ENRICH_MAX_AGE_HOURS, &raw)?;
            config.enrich.max_age = i64::try_from(hours)
                .ok()
                .and_then(chrono::Duration::try_hours)
                .ok_or_else(|| ConfigError::InvalidNumber {
                    key: env_keys::ENRICH_MAX_AGE_HOURS,
                    value: raw.clone(),
                })?;
        }

        config.credentials = SourceCredentials {
            github_token: get(env_keys::GITHUB_TOKEN),
            gitlab_token: get(env_keys::GITLAB_TOKEN),
        };

        Ok(config)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("servers.json")
    }

    pub fn sync_state_path(&self) -> PathBuf {
        self.data_dir.join("sync-state.json")
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })
}
