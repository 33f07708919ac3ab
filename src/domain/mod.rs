//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - region identity and the per-metric series store (`Region`, `Dataset`)
//! - metric derivation (`MetricTag`, `MetricDefinition`, `DerivedSeries`)
//! - growth outputs (`GrowthFit`, `RateSample`) and the run configuration

pub mod types;

pub use types::*;
