//! Reporting: plain-text summaries of a finished run.

pub mod format;

pub use format::*;
