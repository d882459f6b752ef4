//! Wire types for the upstream MCP registry `/servers` endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{Enrichment, Package, Remote, Repository, ServerRecord, ServerStatus};

/// Key the official registry nests its lifecycle metadata under
pub const OFFICIAL_META_KEY: &str = "io.modelcontextprotocol.registry/official";

/// One page of `GET /servers`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerListResponse {
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub metadata: ListMetadata,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerEntry {
    pub server: ServerJson,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaEnvelope>,
}

/// The registry's server document (only the fields this indexer keeps)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerJson {
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
}

/// Lifecycle metadata attached by the registry
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMeta {
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Absent means current
    #[serde(default = "default_is_latest")]
    pub is_latest: bool,
}

fn default_is_latest() -> bool {
    true
}

/// `_meta` appears either namespaced under [`OFFICIAL_META_KEY`] or flat.
///
/// The official key is looked up explicitly: when it is present but does not
/// decode, the entry is `Malformed` and never counts as the latest version.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub enum MetaEnvelope {
    Namespaced(RegistryMeta),
    Flat(RegistryMeta),
    Malformed(Map<String, Value>),
}

impl From<Map<String, Value>> for MetaEnvelope {
    fn from(map: Map<String, Value>) -> Self {
        let decoded = match map.get(OFFICIAL_META_KEY) {
            Some(official) => {
                serde_json::from_value(official.clone()).map(MetaEnvelope::Namespaced)
            }
            None => serde_json::from_value(Value::Object(map.clone())).map(MetaEnvelope::Flat),
        };

        decoded.unwrap_or_else(|e| {
            warn!("[Registry] Unreadable _meta, treating entry as superseded: {}", e);
            MetaEnvelope::Malformed(map)
        })
    }
}

impl From<MetaEnvelope> for Map<String, Value> {
    fn from(envelope: MetaEnvelope) -> Self {
        let as_object = |meta: RegistryMeta| match serde_json::to_value(meta) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        match envelope {
            MetaEnvelope::Namespaced(meta) => {
                let mut map = Map::new();
                map.insert(OFFICIAL_META_KEY.to_string(), Value::Object(as_object(meta)));
                map
            }
            MetaEnvelope::Flat(meta) => as_object(meta),
            MetaEnvelope::Malformed(map) => map,
        }
    }
}

impl MetaEnvelope {
    /// Decoded lifecycle metadata, `None` when malformed
    pub fn registry_meta(&self) -> Option<&RegistryMeta> {
        match self {
            MetaEnvelope::Namespaced(meta) | MetaEnvelope::Flat(meta) => Some(meta),
            MetaEnvelope::Malformed(_) => None,
        }
    }
}

impl ServerEntry {
    /// Entries without lifecycle metadata are treated as current, entries
    /// with unreadable metadata as superseded.
    pub fn is_latest(&self) -> bool {
        match &self.meta {
            None => true,
            Some(envelope) => envelope.registry_meta().map(|m| m.is_latest).unwrap_or(false),
        }
    }

    pub fn status(&self) -> ServerStatus {
        match &self.meta {
            None => ServerStatus::default(),
            Some(envelope) => envelope
                .registry_meta()
                .map(|m| m.status)
                .unwrap_or(ServerStatus::Unknown),
        }
    }

    /// Convert to a record with empty enrichment and derived fields.
    pub fn into_record(self) -> ServerRecord {
        let meta = match &self.meta {
            None => RegistryMeta {
                is_latest: true,
                ..RegistryMeta::default()
            },
            Some(envelope) => envelope.registry_meta().cloned().unwrap_or(RegistryMeta {
                status: ServerStatus::Unknown,
                is_latest: false,
                ..RegistryMeta::default()
            }),
        };
        let ServerJson {
            name,
            description,
            version,
            repository,
            packages,
            remotes,
        } = self.server;

        ServerRecord {
            name,
            description,
            version,
            repository: repository.filter(|r| !r.url.trim().is_empty()),
            packages,
            remotes,
            status: meta.status,
            published_at: meta.published_at,
            updated_at: meta.updated_at,
            is_latest: meta.is_latest,
            enrichment: Enrichment::default(),
            computed: Default::default(),
        }
    }
}
