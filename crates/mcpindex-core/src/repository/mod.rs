//! Repository traits for data access
//!
//! These traits define how the orchestrator reads and replaces its persisted
//! state without specifying the implementation (JSON files, in-memory, etc.)

use async_trait::async_trait;

use crate::domain::{ServerRecord, SyncState};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Snapshot of every known server record
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Load the last persisted snapshot (empty if none exists yet)
    async fn load(&self) -> RepoResult<Vec<ServerRecord>>;

    /// Replace the whole snapshot. Implementations must never leave a
    /// partially written snapshot behind.
    async fn save(&self, records: &[ServerRecord]) -> RepoResult<()>;
}

/// Singleton sync checkpoint
#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    /// Load the checkpoint (`None` on first run)
    async fn load(&self) -> RepoResult<Option<SyncState>>;

    /// Replace the checkpoint
    async fn save(&self, state: &SyncState) -> RepoResult<()>;
}
