//! JSON file implementation of SnapshotRepository.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use mcpindex_core::{ServerRecord, SnapshotRepository};
use tracing::info;

use crate::json_file::{read_json, write_json_atomic};

/// Snapshot stored as a single JSON array of records.
pub struct JsonSnapshotRepository {
    path: PathBuf,
}

impl JsonSnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotRepository for JsonSnapshotRepository {
    async fn load(&self) -> Result<Vec<ServerRecord>> {
        let records: Vec<ServerRecord> = read_json(&self.path).await?.unwrap_or_default();
        info!(
            "[SnapshotRepository::load] {} servers from {:?}",
            records.len(),
            self.path
        );
        Ok(records)
    }

    async fn save(&self, records: &[ServerRecord]) -> Result<()> {
        write_json_atomic(&self.path, records).await?;
        info!(
            "[SnapshotRepository::save] Wrote {} servers to {:?}",
            records.len(),
            self.path
        );
        Ok(())
    }
}
