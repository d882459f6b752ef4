//! JSON file implementation of SyncStateRepository.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use mcpindex_core::{SyncState, SyncStateRepository};
use tracing::debug;

use crate::json_file::{read_json, write_json_atomic};

pub struct JsonSyncStateRepository {
    path: PathBuf,
}

impl JsonSyncStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SyncStateRepository for JsonSyncStateRepository {
    async fn load(&self) -> Result<Option<SyncState>> {
        let state = read_json(&self.path).await?;
        if state.is_none() {
            debug!("[SyncStateRepository::load] No sync state at {:?}", self.path);
        }
        Ok(state)
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        write_json_atomic(&self.path, state).await
    }
}
