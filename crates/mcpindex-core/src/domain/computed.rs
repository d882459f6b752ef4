//! Derived fields recomputed for every record on every sync.

use serde::{Deserialize, Serialize};

use super::server::{RegistryType, ServerRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedFields {
    /// Part of `name` before the first '/'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Part of `name` after the first '/', or the whole name
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub package_types: Vec<RegistryType>,
    #[serde(default)]
    pub has_remote: bool,
    #[serde(default)]
    pub total_downloads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
}

/// Build the derived fields for `record` from its current contents.
pub fn compute_server_fields(record: &ServerRecord) -> ComputedFields {
    let (organization, server_name) = match record.name.split_once('/') {
        Some((org, short)) => (Some(org.to_string()), short.to_string()),
        None => (None, record.name.clone()),
    };

    let mut package_types: Vec<RegistryType> = Vec::new();
    for package in &record.packages {
        if !package_types.contains(&package.registry_type) {
            package_types.push(package.registry_type);
        }
    }

    ComputedFields {
        organization,
        server_name,
        package_types,
        has_remote: !record.remotes.is_empty(),
        total_downloads: record.enrichment.total_downloads(),
        stars: record.enrichment.github.as_ref().map(|g| g.stars),
    }
}

/// Recompute derived fields in place for every record.
pub fn apply_computed_fields<'a>(records: impl IntoIterator<Item = &'a mut ServerRecord>) {
    for record in records {
        record.computed = compute_server_fields(record);
    }
}
