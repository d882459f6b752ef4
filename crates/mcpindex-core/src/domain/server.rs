use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::computed::ComputedFields;
use super::enrichment::Enrichment;

/// One row of the published dataset: a single MCP server, keyed by `name`.
///
/// Registry-sourced fields are overwritten on every sync that sees the server.
/// `enrichment` is carried across syncs and only replaced when the server is
/// re-enriched. `computed` is rebuilt from scratch on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// Globally unique server name (e.g. "io.github.acme/tool")
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,

    #[serde(default)]
    pub packages: Vec<Package>,

    #[serde(default)]
    pub remotes: Vec<Remote>,

    #[serde(default)]
    pub status: ServerStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default = "default_true")]
    pub is_latest: bool,

    #[serde(rename = "_enrichment", default)]
    pub enrichment: Enrichment,

    #[serde(rename = "_computed", default)]
    pub computed: ComputedFields,
}

fn default_true() -> bool {
    true
}

impl ServerRecord {
    /// Create a bare record with only a name (mostly useful for tests and fixtures).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: String::new(),
            repository: None,
            packages: Vec::new(),
            remotes: Vec::new(),
            status: ServerStatus::Active,
            published_at: None,
            updated_at: None,
            is_latest: true,
            enrichment: Enrichment::default(),
            computed: ComputedFields::default(),
        }
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_remote(mut self, remote: Remote) -> Self {
        self.remotes.push(remote);
        self
    }

    pub fn with_repository(mut self, url: impl Into<String>) -> Self {
        self.repository = Some(Repository {
            url: url.into(),
            source: None,
            subfolder: None,
        });
        self
    }

    /// First package published to the given registry, if any.
    pub fn package_for(&self, registry_type: RegistryType) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.registry_type == registry_type)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ServerStatus::Deleted
    }
}

/// Source repository reference as published in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfolder: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    Npm,
    Pypi,
    Nuget,
    Oci,
    Mcpb,
    /// Registry types this indexer doesn't know about yet
    #[serde(other)]
    Unknown,
}

impl RegistryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::Npm => "npm",
            RegistryType::Pypi => "pypi",
            RegistryType::Nuget => "nuget",
            RegistryType::Oci => "oci",
            RegistryType::Mcpb => "mcpb",
            RegistryType::Unknown => "unknown",
        }
    }
}

/// A distributable package for a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub registry_type: RegistryType,

    pub identifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<PackageTransport>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<KeyValueInput>,

    /// Content hash of the artifact (mcpb bundles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_sha256: Option<String>,
}

impl Package {
    pub fn new(registry_type: RegistryType, identifier: impl Into<String>) -> Self {
        Self {
            registry_type,
            identifier: identifier.into(),
            version: None,
            registry_base_url: None,
            transport: None,
            environment_variables: Vec::new(),
            file_sha256: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageTransport {
    #[serde(rename = "type")]
    pub transport_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValueInput>,
}

/// Declared environment variable or header for a package/remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A hosted endpoint for a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    /// Transport type ("streamable-http", "sse")
    #[serde(rename = "type")]
    pub transport_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValueInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Active,
    Deprecated,
    Deleted,
    /// A status this indexer doesn't know yet
    #[serde(other)]
    Unknown,
}
