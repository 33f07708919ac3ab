//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built once by the ingest layer and then shared read-only
//! - handed to a renderer as plain data (dates, values, fitted curve)
//! - compared directly in tests

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One reporting unit: a country, or a province/county nested under one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Province/state (region layout) or city/county (county layout).
    pub subdivision: Option<String>,
    /// Country (region layout) or state (county layout).
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `name`, or `name + " " + subdivision` when a subdivision exists.
    pub full_name: String,
}

impl Region {
    pub fn new(subdivision: Option<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let name = name.into();
        let subdivision = subdivision.filter(|s| !s.is_empty());
        let full_name = match &subdivision {
            Some(sub) => format!("{name} {sub}"),
            None => name.clone(),
        };
        Self {
            subdivision,
            name,
            latitude,
            longitude,
            full_name,
        }
    }

    /// Owned snapshot used as the seed of a synthetic parent aggregate.
    ///
    /// The copy shares nothing with `self`, so renaming it leaves the source
    /// row untouched.
    pub fn summed(&self) -> Self {
        let mut copy = self.clone();
        copy.full_name = format!("{} (summed from region data)", self.name);
        copy
    }
}

/// A region's identity plus its value series on the owning dataset's date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSeries {
    pub region: Region,
    pub values: Vec<i64>,
}

/// Canonical per-metric store: one date axis shared by every region series.
///
/// Entries keep insertion order; lookups go through a key index.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    dates: Vec<NaiveDate>,
    entries: Vec<(String, RegionSeries)>,
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Insert a series under `key`.
    ///
    /// Returns `false` (and stores nothing) if the key is already taken or the
    /// series length does not match the date axis.
    pub fn insert(&mut self, key: impl Into<String>, region: Region, values: Vec<i64>) -> bool {
        let key = key.into();
        if values.len() != self.dates.len() || self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, RegionSeries { region, values }));
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The stored key equal to `key`, borrowed from the dataset.
    pub fn key(&self, key: &str) -> Option<&str> {
        self.index.get_key_value(key).map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&RegionSeries> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn region(&self, key: &str) -> Option<&Region> {
        self.get(key).map(|s| &s.region)
    }

    pub fn values(&self, key: &str) -> Option<&[i64]> {
        self.get(key).map(|s| s.values.as_slice())
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, series)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegionSeries)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Base metric reported by the source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetricTag {
    Confirmed,
    Recovered,
    Deaths,
}

impl MetricTag {
    pub const ALL: [MetricTag; 3] = [MetricTag::Confirmed, MetricTag::Recovered, MetricTag::Deaths];

    /// Tag as it appears in snapshot file names and labels.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricTag::Confirmed => "confirmed",
            MetricTag::Recovered => "recovered",
            MetricTag::Deaths => "deaths",
        }
    }
}

impl std::fmt::Display for MetricTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One loaded store per base metric. A metric whose file was missing is absent.
pub type Datasets = HashMap<MetricTag, Dataset>;

/// Which snapshot family to request.
///
/// The parser still detects the column layout from the header; this only
/// selects file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileLayout {
    /// Country-level files with province/state rows.
    Global,
    /// US files with county rows under each state.
    Us,
}

impl FileLayout {
    pub fn file_name(self, tag: MetricTag) -> String {
        let suffix = match self {
            FileLayout::Global => "global",
            FileLayout::Us => "US",
        };
        format!("time_series_covid19_{}_{suffix}.csv", tag.as_str())
    }
}

/// How to derive a displayed series from a base metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub tag: MetricTag,
    pub label: Option<String>,
    /// Shift applied to the date axis, in days.
    pub offset_days: i64,
    pub scale: f64,
    /// When set, values become `v[t] - v[t - window]`.
    pub window: Option<usize>,
}

impl MetricDefinition {
    pub fn new(tag: MetricTag) -> Self {
        Self {
            tag,
            label: None,
            offset_days: 0,
            scale: 1.0,
            window: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_offset(mut self, offset_days: i64) -> Self {
        self.offset_days = offset_days;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Explicit label, or one derived from tag, offset, scale and window.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let mut out = self.tag.as_str().to_string();
        if let Some(window) = self.window {
            out.push_str(&format!(" ({window}-day window)"));
        }
        if self.scale != 1.0 {
            out.push_str(&format!(" x {}", self.scale));
        }
        if self.offset_days != 0 {
            out.push_str(&format!(" shifted by {} days", self.offset_days));
        }
        out
    }

    /// Derive the display series. The inputs are only read.
    pub fn apply(&self, dates: &[NaiveDate], values: &[i64]) -> DerivedSeries {
        let n = dates.len().min(values.len());
        let start = self.window.unwrap_or(0);
        let shift = Duration::days(self.offset_days);

        let mut out_dates = Vec::with_capacity(n.saturating_sub(start));
        let mut out_values = Vec::with_capacity(n.saturating_sub(start));
        for t in start..n {
            // Widened so differences of extreme counts cannot overflow.
            let raw = match self.window {
                Some(w) => i128::from(values[t]) - i128::from(values[t - w]),
                None => i128::from(values[t]),
            };
            out_dates.push(dates[t] + shift);
            out_values.push(raw as f64 * self.scale);
        }

        DerivedSeries {
            label: self.display_label(),
            dates: out_dates,
            values: out_values,
        }
    }

    /// Definitions used when the caller supplies none.
    pub fn defaults() -> Vec<MetricDefinition> {
        vec![
            MetricDefinition::new(MetricTag::Confirmed),
            MetricDefinition::new(MetricTag::Recovered),
            MetricDefinition::new(MetricTag::Deaths),
            MetricDefinition::new(MetricTag::Deaths)
                .with_label("infected (estimated)")
                .with_offset(-17)
                .with_scale(100.0),
            MetricDefinition::new(MetricTag::Confirmed)
                .with_label("active (estimated)")
                .with_window(14),
        ]
    }
}

/// A display series derived from one base metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    pub label: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// Log-linear fit over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthFit {
    /// Start of the fit window and end of the extrapolation horizon.
    pub curve_dates: [NaiveDate; 2],
    /// Fitted values at `curve_dates`.
    pub curve_values: [f64; 2],
    /// Fitted growth rate of `ln(value)` per day.
    pub slope: f64,
    pub intercept: f64,
    /// `ln(2) / slope`; negative for a decaying series.
    pub doubling_time: f64,
}

/// One point of the sliding-window rate curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    /// Last day of the fit window.
    pub date: NaiveDate,
    /// `slope / ln(2)` (doublings per day); `None` where the fit is undefined.
    pub rate: Option<f64>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub queries: Vec<String>,
    pub layout: FileLayout,
    pub data_dir: PathBuf,
    /// Header token of the first date column.
    pub first_date: String,
    pub definitions: Vec<MetricDefinition>,
    pub days_fit: usize,
    pub days_extrapolate: usize,
    /// Slopes at or above this (per day) give an undefined rate sample.
    pub rate_threshold: f64,
    /// Ignore data dated after this day.
    pub as_of: Option<NaiveDate>,
    pub show_rate_curve: bool,
}

impl RunConfig {
    /// Distinct base metrics referenced by the definitions, in first-use order.
    pub fn required_tags(&self) -> Vec<MetricTag> {
        let mut out = Vec::new();
        for def in &self.definitions {
            if !out.contains(&def.tag) {
                out.push(def.tag);
            }
        }
        out
    }

    pub fn data_path(&self, tag: MetricTag) -> PathBuf {
        self.data_dir.join(self.layout.file_name(tag))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            queries: vec!["Germany".to_string()],
            layout: FileLayout::Global,
            data_dir: PathBuf::from("time_series_data"),
            first_date: "1/22/20".to_string(),
            definitions: MetricDefinition::defaults(),
            days_fit: 7,
            days_extrapolate: 7,
            rate_threshold: 10.0,
            as_of: None,
            show_rate_curve: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn full_name_includes_subdivision() {
        let r = Region::new(Some("Hubei".to_string()), "China", 30.9, 112.2);
        assert_eq!(r.full_name, "China Hubei");

        let r = Region::new(Some(String::new()), "Germany", 51.0, 9.0);
        assert_eq!(r.subdivision, None);
        assert_eq!(r.full_name, "Germany");
    }

    #[test]
    fn summed_copy_leaves_source_untouched() {
        let r = Region::new(Some("Hubei".to_string()), "China", 30.9, 112.2);
        let copy = r.summed();
        assert_eq!(copy.full_name, "China (summed from region data)");
        assert_eq!(r.full_name, "China Hubei");
        assert_eq!(copy.subdivision, r.subdivision);
    }

    #[test]
    fn dataset_rejects_length_mismatch_and_duplicates() {
        let mut ds = Dataset::new(vec![day(1), day(2)]);
        let r = Region::new(None, "X", 0.0, 0.0);
        assert!(ds.insert("X", r.clone(), vec![1, 2]));
        assert!(!ds.insert("X", r.clone(), vec![3, 4]));
        assert!(!ds.insert("Y", r, vec![1]));
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.values("X"), Some(&[1, 2][..]));
    }

    #[test]
    fn label_derivation() {
        assert_eq!(MetricDefinition::new(MetricTag::Confirmed).display_label(), "confirmed");
        assert_eq!(
            MetricDefinition::new(MetricTag::Deaths).with_offset(-17).display_label(),
            "deaths shifted by -17 days"
        );
        assert_eq!(
            MetricDefinition::new(MetricTag::Deaths).with_scale(100.0).with_offset(-17).display_label(),
            "deaths x 100 shifted by -17 days"
        );
        assert_eq!(
            MetricDefinition::new(MetricTag::Confirmed).with_window(14).display_label(),
            "confirmed (14-day window)"
        );
        assert_eq!(
            MetricDefinition::new(MetricTag::Deaths).with_label("infected").with_offset(3).display_label(),
            "infected"
        );
    }

    #[test]
    fn apply_shifts_dates_and_scales_values() {
        let dates = vec![day(1), day(2), day(3)];
        let values = vec![1, 2, 4];
        let def = MetricDefinition::new(MetricTag::Deaths).with_offset(-2).with_scale(10.0);
        let out = def.apply(&dates, &values);
        assert_eq!(out.dates, vec![day(1) - Duration::days(2), day(2) - Duration::days(2), day(1)]);
        assert_eq!(out.values, vec![10.0, 20.0, 40.0]);
        assert_eq!(values, vec![1, 2, 4]);
    }

    #[test]
    fn apply_window_differences() {
        let dates: Vec<_> = (1..=5).map(day).collect();
        let values = vec![1, 3, 6, 10, 15];
        let out = MetricDefinition::new(MetricTag::Confirmed).with_window(2).apply(&dates, &values);
        assert_eq!(out.dates, vec![day(3), day(4), day(5)]);
        assert_eq!(out.values, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn window_longer_than_series_is_empty() {
        let dates: Vec<_> = (1..=3).map(day).collect();
        let out = MetricDefinition::new(MetricTag::Confirmed).with_window(5).apply(&dates, &[1, 2, 3]);
        assert!(out.dates.is_empty());
        assert!(out.values.is_empty());
    }

    #[test]
    fn window_difference_of_extreme_counts() {
        let dates: Vec<_> = (1..=3).map(day).collect();
        let values = vec![-5, i64::MAX, i64::MIN];
        let out = MetricDefinition::new(MetricTag::Confirmed).with_window(1).apply(&dates, &values);
        assert_eq!(out.values.len(), 2);
        assert!(out.values[0] > 9.2e18, "value={}", out.values[0]);
        assert!(out.values[1] < -1.8e19, "value={}", out.values[1]);
    }

    #[test]
    fn required_tags_are_distinct_in_order() {
        let config = RunConfig::default();
        assert_eq!(
            config.required_tags(),
            vec![MetricTag::Confirmed, MetricTag::Recovered, MetricTag::Deaths]
        );
    }

    #[test]
    fn file_names_per_layout() {
        assert_eq!(
            FileLayout::Global.file_name(MetricTag::Confirmed),
            "time_series_covid19_confirmed_global.csv"
        );
        assert_eq!(FileLayout::Us.file_name(MetricTag::Deaths), "time_series_covid19_deaths_US.csv");
    }
}
