//! Domain entities and value objects
//!
//! - `ServerRecord` and its registry-sourced parts (packages, remotes)
//! - `Enrichment` slots filled by the source enrichers
//! - `ComputedFields` derived from the above on every run
//! - `SyncState` checkpoint and the run configuration

pub mod computed;
pub mod config;
mod enrichment;
mod server;
mod sync_state;

pub use computed::{apply_computed_fields, compute_server_fields, ComputedFields};
pub use config::*;
pub use enrichment::*;
pub use server::*;
pub use sync_state::{SyncState, SYNC_STATE_VERSION};
