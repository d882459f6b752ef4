//! Mock implementations for testing
//!
//! In-memory repositories and a canned enricher for fast, isolated tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use mcpindex_core::{
    enrichers::{EnrichResult, Enricher},
    repository::{RepoResult, SnapshotRepository, SyncStateRepository},
    ServerRecord, SourceData, SourceKind, SyncState,
};

// ============================================================================
// MockSnapshotRepository
// ============================================================================

#[derive(Default)]
pub struct MockSnapshotRepository {
    records: RwLock<Vec<ServerRecord>>,
    saves: AtomicUsize,
}

impl MockSnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, records: Vec<ServerRecord>) -> Self {
        *self.records.write().unwrap() = records;
        self
    }

    pub fn records(&self) -> Vec<ServerRecord> {
        self.records.read().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotRepository for MockSnapshotRepository {
    async fn load(&self) -> RepoResult<Vec<ServerRecord>> {
        Ok(self.records())
    }

    async fn save(&self, records: &[ServerRecord]) -> RepoResult<()> {
        *self.records.write().unwrap() = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// MockSyncStateRepository
// ============================================================================

#[derive(Default)]
pub struct MockSyncStateRepository {
    state: RwLock<Option<SyncState>>,
}

impl MockSyncStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, state: SyncState) -> Self {
        *self.state.write().unwrap() = Some(state);
        self
    }

    pub fn state(&self) -> Option<SyncState> {
        self.state.read().unwrap().clone()
    }
}

#[async_trait]
impl SyncStateRepository for MockSyncStateRepository {
    async fn load(&self) -> RepoResult<Option<SyncState>> {
        Ok(self.state())
    }

    async fn save(&self, state: &SyncState) -> RepoResult<()> {
        *self.state.write().unwrap() = Some(state.clone());
        Ok(())
    }
}

// ============================================================================
// StaticEnricher
// ============================================================================

/// Applies to every record and always returns the same data
pub struct StaticEnricher {
    data: SourceData,
    calls: AtomicUsize,
}

impl StaticEnricher {
    pub fn new(data: SourceData) -> Self {
        Self {
            data,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enricher for StaticEnricher {
    fn kind(&self) -> SourceKind {
        self.data.kind()
    }

    fn applies_to(&self, _record: &ServerRecord) -> bool {
        true
    }

    async fn enrich(&self, _record: &ServerRecord) -> EnrichResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.data.clone()))
    }
}
