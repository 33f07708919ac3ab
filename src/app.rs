//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - turns flags into a `RunConfig`
//! - runs the analysis pipeline and prints the report
//! - downloads snapshot files on request

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Command, DataArgs, FetchArgs, PlotArgs};
use crate::data::SnapshotClient;
use crate::domain::{FileLayout, MetricDefinition, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable naming the default data directory.
pub const DATA_DIR_ENV: &str = "EPIGROWTH_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "time_series_data";

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    // `epi Germany Italy` should behave like `epi plot Germany Italy`; see
    // `rewrite_args` for the exact rules.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    crate::logging::init_logging(cli.verbose)?;

    match cli.command {
        Command::Plot(args) => handle_plot(args),
        Command::Fetch(args) => handle_fetch(args),
    }
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_analysis(&config)?;

    println!("{}", crate::report::format_run(&run, &config));
    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let layout = layout_from_args(&args.data);
    let dir = data_dir_from_args(&args.data);

    let client = SnapshotClient::from_env();
    let summary = client.fetch_all(layout, &dir)?;

    for path in &summary.written {
        println!("wrote {}", path.display());
    }
    for tag in &summary.unavailable {
        println!("not published: {tag}");
    }
    Ok(())
}

pub fn run_config_from_args(args: &PlotArgs) -> RunConfig {
    RunConfig {
        queries: args.regions.clone(),
        layout: layout_from_args(&args.data),
        data_dir: data_dir_from_args(&args.data),
        first_date: args.first_date.clone(),
        definitions: MetricDefinition::defaults(),
        days_fit: args.fit_days,
        days_extrapolate: args.extrapolate_days,
        rate_threshold: args.rate_threshold,
        as_of: args.as_of,
        show_rate_curve: args.rate_curve,
    }
}

fn layout_from_args(args: &DataArgs) -> FileLayout {
    if args.us { FileLayout::Us } else { FileLayout::Global }
}

/// `--data-dir`, else `$EPIGROWTH_DATA_DIR` (also read from `.env`), else `time_series_data`.
fn data_dir_from_args(args: &DataArgs) -> PathBuf {
    if let Some(dir) = &args.data_dir {
        return dir.clone();
    }
    dotenvy::dotenv().ok();
    std::env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Rewrite argv so `epi` defaults to `epi plot`.
///
/// Rules:
/// - `epi`                       -> `epi plot`
/// - `epi Germany Italy`         -> `epi plot Germany Italy`
/// - `epi --us Washington`       -> `epi plot --us Washington`
/// - `epi --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("plot".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "plot" | "fetch");
    if is_subcommand {
        return argv;
    }

    argv.insert(1, "plot".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_plot() {
        assert_eq!(rewrite_args(args(&["epi"])), args(&["epi", "plot"]));
    }

    #[test]
    fn regions_and_flags_go_to_plot() {
        assert_eq!(
            rewrite_args(args(&["epi", "Germany", "Italy"])),
            args(&["epi", "plot", "Germany", "Italy"])
        );
        assert_eq!(
            rewrite_args(args(&["epi", "--us", "Washington"])),
            args(&["epi", "plot", "--us", "Washington"])
        );
    }

    #[test]
    fn subcommands_and_help_are_unchanged() {
        assert_eq!(rewrite_args(args(&["epi", "fetch"])), args(&["epi", "fetch"]));
        assert_eq!(rewrite_args(args(&["epi", "--help"])), args(&["epi", "--help"]));
    }

    #[test]
    fn config_from_parsed_args() {
        let cli = crate::cli::Cli::parse_from(args(&[
            "epi", "plot", "Hubei", "--us", "--data-dir", "/tmp/x", "--fit-days", "5", "--as-of", "2020-04-01",
        ]));
        let Command::Plot(plot) = cli.command else {
            panic!("expected plot command");
        };
        let config = run_config_from_args(&plot);
        assert_eq!(config.queries, vec!["Hubei".to_string()]);
        assert_eq!(config.layout, FileLayout::Us);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.days_fit, 5);
        assert_eq!(config.as_of, chrono::NaiveDate::from_ymd_opt(2020, 4, 1));
        assert_eq!(config.first_date, "1/22/20");
    }

    #[test]
    fn default_region_is_germany() {
        let cli = crate::cli::Cli::parse_from(args(&["epi", "plot"]));
        let Command::Plot(plot) = cli.command else {
            panic!("expected plot command");
        };
        assert_eq!(plot.regions, vec!["Germany".to_string()]);
        assert_eq!(plot.fit_days, crate::growth::DEFAULT_DAYS_FIT);
    }
}
