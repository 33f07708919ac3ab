//! Formatted terminal output.
//!
//! We keep formatting code in one place so the ingest and fitting code stay
//! free of presentation concerns.

use crate::app::pipeline::{ComputedMetric, MetricOutcome, RegionReport, RunOutput};
use crate::domain::{GrowthFit, RateSample, RunConfig};

/// Format the full run: one block per region, then skipped queries.
pub fn format_run(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== epi - growth analysis ===\n");
    out.push_str(&format!(
        "Data: {} ({:?}) | fit window={}d | extrapolate={}d\n",
        config.data_dir.display(),
        config.layout,
        config.days_fit,
        config.days_extrapolate
    ));
    if let Some(as_of) = config.as_of {
        out.push_str(&format!("As-of: {as_of}\n"));
    }
    if !run.unavailable.is_empty() {
        let tags: Vec<String> = run.unavailable.iter().map(|t| t.to_string()).collect();
        out.push_str(&format!("Unavailable metrics: {}\n", tags.join(", ")));
    }

    for region in &run.regions {
        out.push('\n');
        out.push_str(&format_region(region, config.show_rate_curve));
    }

    for query in &run.not_found {
        out.push_str(&format!("\nRegion '{query}' not found.\n"));
    }

    out
}

/// Format one region's metric table (and optionally rate curves).
pub fn format_region(report: &RegionReport, show_rate_curve: bool) -> String {
    let mut out = String::new();

    let r = &report.region;
    out.push_str(&format!(
        "{} ({:.2}°, {:.2}°)",
        report.key, r.latitude, r.longitude
    ));
    if report.query != report.key {
        out.push_str(&format!("  [query: {}]", report.query));
    }
    out.push('\n');

    out.push_str(&format!(
        "  {:<28} {:>12} {:>12} {:>16}\n",
        "series", "last date", "last value", "doubling (days)"
    ));
    for metric in &report.metrics {
        match &metric.outcome {
            MetricOutcome::Unavailable { reason } => {
                out.push_str(&format!("  {:<28} ({reason})\n", metric.label));
            }
            MetricOutcome::Computed(m) => {
                out.push_str(&format!("  {:<28} {}\n", metric.label, format_metric_row(m)));
            }
        }
    }

    if show_rate_curve {
        for metric in &report.metrics {
            if let MetricOutcome::Computed(m) = &metric.outcome {
                out.push_str(&format!("  rate curve: {}\n", metric.label));
                out.push_str(&format_rate_curve(&m.rate_curve));
            }
        }
    }

    out
}

fn format_metric_row(m: &ComputedMetric) -> String {
    let (last_date, last_value) = match (m.series.dates.last(), m.series.values.last()) {
        (Some(d), Some(v)) => (d.to_string(), format!("{v:.0}")),
        _ => ("-".to_string(), "-".to_string()),
    };
    let doubling = match &m.fit {
        Ok(fit) => format_doubling(fit),
        Err(e) => format!("n/a ({e})"),
    };
    format!("{last_date:>12} {last_value:>12} {doubling:>16}")
}

/// Doubling time, or halving time for a shrinking series.
pub fn format_doubling(fit: &GrowthFit) -> String {
    let d = fit.doubling_time;
    if !d.is_finite() || d.abs() > 1e6 {
        "flat".to_string()
    } else if d < 0.0 {
        format!("{d:.1} (halving)")
    } else {
        format!("{d:.1}")
    }
}

fn format_rate_curve(samples: &[RateSample]) -> String {
    if samples.is_empty() {
        return "    (series shorter than fit window)\n".to_string();
    }
    let mut out = String::new();
    for s in samples {
        match s.rate {
            Some(rate) => out.push_str(&format!("    {}  {:>8.4}/day\n", s.date, rate)),
            None => out.push_str(&format!("    {}  {:>8}\n", s.date, "-")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn fit(doubling_time: f64) -> GrowthFit {
        let d = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        GrowthFit {
            curve_dates: [d, d],
            curve_values: [1.0, 1.0],
            slope: std::f64::consts::LN_2 / doubling_time,
            intercept: 0.0,
            doubling_time,
        }
    }

    #[test]
    fn doubling_formats() {
        assert_eq!(format_doubling(&fit(5.0)), "5.0");
        assert_eq!(format_doubling(&fit(-4.3)), "-4.3 (halving)");
        assert_eq!(format_doubling(&fit(f64::INFINITY)), "flat");
    }

    #[test]
    fn rate_curve_marks_undefined_samples() {
        let d = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let text = format_rate_curve(&[
            RateSample { date: d, rate: Some(0.25) },
            RateSample { date: d, rate: None },
        ]);
        assert!(text.contains("0.2500/day"));
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().trim_end().ends_with('-'));
    }
}
