//! Command-line parsing for the growth analyser.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from ingest and fitting code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

use crate::growth::{DEFAULT_DAYS_EXTRAPOLATE, DEFAULT_DAYS_FIT, DEFAULT_RATE_THRESHOLD};
use crate::io::ingest::FIRST_DATE_HEADER;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "epi", version, about = "Case-count growth and doubling-time analysis")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load snapshots, fit growth per region and metric, and print a summary.
    Plot(PlotArgs),
    /// Download the snapshot files into the data directory.
    Fetch(FetchArgs),
}

/// Options shared by every command that touches the data directory.
#[derive(Debug, Parser, Clone)]
pub struct DataArgs {
    /// Use the US county-level files instead of the global ones.
    #[arg(long)]
    pub us: bool,

    /// Directory holding the snapshot CSV files (default: $EPIGROWTH_DATA_DIR or `time_series_data`).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// Regions to analyse: full names ("China Hubei") or subdivision names ("Hubei").
    #[arg(value_name = "REGION", default_values_t = vec![String::from("Germany")])]
    pub regions: Vec<String>,

    #[command(flatten)]
    pub data: DataArgs,

    /// Trailing window (days) for the doubling-time fit.
    #[arg(long, default_value_t = DEFAULT_DAYS_FIT)]
    pub fit_days: usize,

    /// Days to extrapolate the fitted curve past the window.
    #[arg(long, default_value_t = DEFAULT_DAYS_EXTRAPOLATE)]
    pub extrapolate_days: usize,

    /// Growth rates at or above this (per day) are reported as undefined.
    #[arg(long, default_value_t = DEFAULT_RATE_THRESHOLD)]
    pub rate_threshold: f64,

    /// Ignore data after this date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Header of the first date column in the snapshot files.
    #[arg(long, default_value = FIRST_DATE_HEADER)]
    pub first_date: String,

    /// Also print the sliding-window rate curve.
    #[arg(long)]
    pub rate_curve: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub data: DataArgs,
}
