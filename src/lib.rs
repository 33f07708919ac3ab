//! `epigrowth` library crate.
//!
//! The binary (`epi`) is a thin wrapper around this library so that:
//!
//! - ingest, aggregation and fitting are testable without spawning processes
//! - a renderer can consume `app::pipeline::RunOutput` directly
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod growth;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;
pub mod resolve;
