//! McpIndex Storage Layer
//!
//! JSON files on disk behind the core repository traits.
//!
//! # Layout
//!
//! ```text
//! {data_dir}/
//! ├── servers.json      snapshot: array of ServerRecord sorted by name
//! └── sync-state.json   checkpoint for the next run
//! ```
//!
//! Every save writes a sibling temp file and renames it over the target, so
//! readers only ever see the previous or the new file.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcpindex_storage::{JsonSnapshotRepository, JsonSyncStateRepository};
//! use std::sync::Arc;
//!
//! let snapshots = Arc::new(JsonSnapshotRepository::new(config.snapshot_path()));
//! let sync_state = Arc::new(JsonSyncStateRepository::new(config.sync_state_path()));
//! ```

mod json_file;
mod repositories;

pub use json_file::{read_json, write_json_atomic};
pub use repositories::{JsonSnapshotRepository, JsonSyncStateRepository};
