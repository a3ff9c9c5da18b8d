//! Dataset drivers
//!
//! Each driver knows one data source end to end: how to enumerate its work
//! items, which parser and transforms its payloads need, and where the rows
//! land. The orchestrator in [`crate::process`] stays source-agnostic.

pub mod fixtures_api;
pub mod football_data;

/// Outcome counters for one driver run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Items transformed and loaded
    pub processed: usize,
    /// Items skipped (missing remote data or failed validation)
    pub skipped: usize,
    /// Total rows written across all loads
    pub rows_loaded: u64,
}
