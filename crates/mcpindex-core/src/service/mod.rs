//! Domain services
//!
//! Fetching, enrichment and the sync run that ties them to the repositories.

mod enrichment_coordinator;
mod registry_api_client;
pub mod resilient_fetch;
mod sync_orchestrator;

pub use enrichment_coordinator::{EnrichmentCoordinator, EnrichmentStats};
pub use registry_api_client::*;
pub use resilient_fetch::{
    classify_reqwest_error, fetch_with_retry, retry_with_backoff, FetchError, FetchedResponse,
    HttpFetcher, NetworkError, NetworkErrorKind,
};
pub use sync_orchestrator::{
    decide_mode, merge_entries, MergeOutcome, SyncMode, SyncOrchestrator, SyncReport,
};
