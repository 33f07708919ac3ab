//! Input helpers.
//!
//! - snapshot CSV ingest + validation (`ingest`)

pub mod ingest;

pub use ingest::*;
