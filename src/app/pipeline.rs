//! Shared analysis pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load snapshots -> aggregate -> resolve queries -> derive series -> fit
//!
//! Failures are isolated at the narrowest scope that makes sense:
//! - a missing snapshot file removes that metric only
//! - an unknown query is recorded and skipped
//! - a failed fit is recorded on that one metric of that one region
//!
//! Only a malformed snapshot file aborts the run.

use crate::aggregate::aggregate_subdivisions;
use crate::domain::{Datasets, DerivedSeries, GrowthFit, MetricDefinition, MetricTag, RateSample, Region, RunConfig};
use crate::error::{AppError, FitError};
use crate::growth::{fit_trailing, rate_curve};
use crate::io::ingest::{ParseOptions, load_dataset};
use crate::resolve::resolve_region;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub regions: Vec<RegionReport>,
    /// Queries that matched no region.
    pub not_found: Vec<String>,
    /// Base metrics whose snapshot file was absent.
    pub unavailable: Vec<MetricTag>,
}

/// Everything computed for one resolved query.
#[derive(Debug, Clone)]
pub struct RegionReport {
    pub query: String,
    pub key: String,
    pub region: Region,
    pub metrics: Vec<MetricReport>,
}

/// One metric definition applied to one region.
#[derive(Debug, Clone)]
pub struct MetricReport {
    pub definition: MetricDefinition,
    pub label: String,
    pub outcome: MetricOutcome,
}

#[derive(Debug, Clone)]
pub enum MetricOutcome {
    /// The base metric or the region is missing from the loaded data.
    Unavailable { reason: String },
    Computed(ComputedMetric),
}

/// Plain data handed to a renderer.
#[derive(Debug, Clone)]
pub struct ComputedMetric {
    pub series: DerivedSeries,
    pub fit: Result<GrowthFit, FitError>,
    pub rate_curve: Vec<RateSample>,
}

/// Load every metric the run needs, then analyse the configured queries.
pub fn run_analysis(config: &RunConfig) -> Result<RunOutput, AppError> {
    validate_config(config)?;

    let datasets = load_datasets(config)?;
    if datasets.is_empty() {
        return Err(AppError::new(
            2,
            format!("No snapshot files found in '{}'.", config.data_dir.display()),
        ));
    }

    Ok(analyze(&datasets, config))
}

/// Load and aggregate one dataset per required metric.
///
/// A missing file leaves that metric out of the map; any other load error is fatal.
pub fn load_datasets(config: &RunConfig) -> Result<Datasets, AppError> {
    let options = ParseOptions {
        first_date: config.first_date.clone(),
    };

    let mut datasets = Datasets::new();
    for tag in config.required_tags() {
        let path = config.data_path(tag);
        match load_dataset(&path, &options) {
            Ok(mut dataset) => {
                let summary = aggregate_subdivisions(&mut dataset);
                tracing::info!(
                    metric = %tag,
                    regions = dataset.len(),
                    days = dataset.dates().len(),
                    aggregates = summary.published.len() + summary.collided.len(),
                    overflowed = summary.overflowed.len(),
                    "metric loaded"
                );
                datasets.insert(tag, dataset);
            }
            Err(err) if err.is_missing() => {
                tracing::warn!(metric = %tag, path = %path.display(), "snapshot file missing, metric unavailable");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(datasets)
}

/// Analyse every query against already loaded datasets.
pub fn analyze(datasets: &Datasets, config: &RunConfig) -> RunOutput {
    let mut output = RunOutput {
        regions: Vec::new(),
        not_found: Vec::new(),
        unavailable: config
            .required_tags()
            .into_iter()
            .filter(|tag| !datasets.contains_key(tag))
            .collect(),
    };

    // Queries resolve against the first metric that loaded.
    let primary = config.required_tags().into_iter().find_map(|tag| datasets.get(&tag));

    for query in &config.queries {
        let resolved = primary.and_then(|ds| {
            let key = resolve_region(ds, query)?;
            Some((key.to_string(), ds.region(key)?.clone()))
        });
        let Some((key, region)) = resolved else {
            tracing::warn!(query = %query, "region not found");
            output.not_found.push(query.clone());
            continue;
        };

        tracing::info!(query = %query, region = %key, "analysing region");
        let metrics = config
            .definitions
            .iter()
            .map(|def| analyze_metric(datasets, &key, def, config))
            .collect();

        output.regions.push(RegionReport {
            query: query.clone(),
            key,
            region,
            metrics,
        });
    }

    output
}

fn analyze_metric(datasets: &Datasets, key: &str, def: &MetricDefinition, config: &RunConfig) -> MetricReport {
    let label = def.display_label();

    let Some(dataset) = datasets.get(&def.tag) else {
        tracing::debug!(metric = %def.tag, label = %label, "metric unavailable, skipped");
        return MetricReport {
            definition: def.clone(),
            label,
            outcome: MetricOutcome::Unavailable {
                reason: format!("no {} data loaded", def.tag),
            },
        };
    };
    let Some(values) = dataset.values(key) else {
        tracing::debug!(metric = %def.tag, region = %key, "region absent from metric, skipped");
        return MetricReport {
            definition: def.clone(),
            label,
            outcome: MetricOutcome::Unavailable {
                reason: format!("'{key}' not present in {} data", def.tag),
            },
        };
    };

    // `as_of` cuts the source axis, before any offset moves the dates.
    let dates = dataset.dates();
    let end = match config.as_of {
        Some(as_of) => dates.partition_point(|d| *d <= as_of),
        None => dates.len(),
    };
    let series = def.apply(&dates[..end], &values[..end.min(values.len())]);

    let fit = fit_trailing(&series.dates, &series.values, config.days_fit, config.days_extrapolate);
    if let Err(err) = &fit {
        tracing::warn!(region = %key, metric = %label, error = %err, "growth fit skipped");
    }
    let rate_curve = rate_curve(&series.dates, &series.values, config.days_fit, config.rate_threshold);

    MetricReport {
        definition: def.clone(),
        label,
        outcome: MetricOutcome::Computed(ComputedMetric {
            series,
            fit,
            rate_curve,
        }),
    }
}

fn validate_config(config: &RunConfig) -> Result<(), AppError> {
    if config.days_fit < 2 {
        return Err(AppError::new(2, "Fit window must be at least 2 days."));
    }
    if !(config.rate_threshold.is_finite() && config.rate_threshold > 0.0) {
        return Err(AppError::new(2, "Rate threshold must be finite and > 0."));
    }
    if config.definitions.is_empty() {
        return Err(AppError::new(2, "No metric definitions configured."));
    }
    for def in &config.definitions {
        if !def.scale.is_finite() {
            return Err(AppError::new(
                2,
                format!("Invalid scale for '{}' (must be finite).", def.display_label()),
            ));
        }
        if def.window == Some(0) {
            return Err(AppError::new(
                2,
                format!("Window for '{}' must be at least 1 day.", def.display_label()),
            ));
        }
    }
    Ok(())
}
