//! Upstream data access.

pub mod fetch;

pub use fetch::{FetchSummary, SnapshotClient};
