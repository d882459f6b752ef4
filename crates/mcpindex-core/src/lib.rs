//! # McpIndex Core Library
//!
//! Registry sync and metadata enrichment for the MCP server index.
//!
//! ## Modules
//!
//! - `domain` - Core entities (ServerRecord, Enrichment, SyncState) and run configuration
//! - `registry` - Upstream MCP registry wire types
//! - `repository` - Persistence traits for the snapshot and sync state
//! - `enrichers` - One enricher per external metadata source
//! - `service` - Resilient fetch, registry client, enrichment coordinator, sync orchestrator

pub mod domain;
pub mod enrichers;
pub mod registry;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use domain::*;
pub use repository::*;
pub use service::*;
