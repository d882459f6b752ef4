//! Source enricher tests against mocked source APIs

mod packages;
mod release;
