//! MCP Server Registry
//!
//! Wire format of the upstream registry API and conversion into records.

mod types;

pub use types::*;
