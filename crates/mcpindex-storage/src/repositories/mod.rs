//! Repository implementations backed by JSON files.

mod snapshot_repository;
mod sync_state_repository;

pub use snapshot_repository::JsonSnapshotRepository;
pub use sync_state_repository::JsonSyncStateRepository;
