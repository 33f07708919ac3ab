//! Snapshot CSV ingest.
//!
//! A snapshot file is a wide table: a block of identity columns followed by a
//! contiguous, ascending run of date columns (`m/d/yy`), one row per region.
//! This module turns such a file into a `Dataset`.
//!
//! Two identity layouts exist:
//! - region layout: `Province/State, Country/Region, Lat, Long`
//! - county layout (marked by an `Admin2` column): `Admin2, Province_State, Lat, Long_`
//!
//! Any other columns (UIDs, FIPS codes, population) are ignored. Parsing is
//! strict: a header without the expected markers or a non-integer value cell
//! fails the whole file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{Dataset, Region};
use crate::error::LoadError;

/// Header of the first reported day in the upstream snapshots.
pub const FIRST_DATE_HEADER: &str = "1/22/20";

const DATE_FORMAT: &str = "%m/%d/%y";

/// Presence of this column selects the county layout.
const COUNTY_MARKER: &str = "admin2";

/// Parser settings.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Header token of the first date column; it and every later column are dates.
    pub first_date: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            first_date: FIRST_DATE_HEADER.to_string(),
        }
    }
}

/// Identity column layout, detected from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    Region,
    County,
}

impl ColumnLayout {
    fn detect(header_map: &HashMap<String, usize>) -> Self {
        if header_map.contains_key(COUNTY_MARKER) {
            ColumnLayout::County
        } else {
            ColumnLayout::Region
        }
    }

    /// Normalized names of the subdivision, name, latitude and longitude columns.
    fn identity_columns(self) -> [&'static str; 4] {
        match self {
            ColumnLayout::Region => ["province/state", "country/region", "lat", "long"],
            ColumnLayout::County => ["admin2", "province_state", "lat", "long_"],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct IdentityColumns {
    subdivision: usize,
    name: usize,
    latitude: usize,
    longitude: usize,
}

/// Load one snapshot file.
///
/// A nonexistent file yields `LoadError::MissingFile`, which callers are expected
/// to treat as "metric unavailable".
pub fn load_dataset(path: &Path, options: &ParseOptions) -> Result<Dataset, LoadError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Read {
                path: path.to_path_buf(),
                source: e.into(),
            }
        }
    })?;

    parse_dataset(file, path, options)
}

/// Parse snapshot CSV from any reader. `source` is only used in error messages.
pub fn parse_dataset<R: Read>(reader: R, source: &Path, options: &ParseOptions) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Read {
            path: source.to_path_buf(),
            source: e,
        })?
        .clone();

    let header_map = build_header_map(&headers);
    let layout = ColumnLayout::detect(&header_map);
    let identity = resolve_identity_columns(layout, &header_map)
        .map_err(|reason| format_error(source, reason))?;

    let first_date = normalize_header_name(&options.first_date);
    let date_start = headers
        .iter()
        .position(|h| normalize_header_name(h) == first_date)
        .ok_or_else(|| format_error(source, format!("first date column '{}' not found", options.first_date)))?;

    let dates = headers
        .iter()
        .skip(date_start)
        .map(parse_date_header)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|reason| format_error(source, reason))?;

    let mut dataset = Dataset::new(dates);
    let n_cols = headers.len();

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and records() is 0-based.
        let line = idx + 2;
        let record = result.map_err(|e| LoadError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        if record.len() < n_cols {
            return Err(format_error(
                source,
                format!("line {line} has {} fields, header has {n_cols}", record.len()),
            ));
        }

        let region = parse_region(&record, identity);

        let mut values = Vec::with_capacity(n_cols - date_start);
        for col in date_start..n_cols {
            let cell = record.get(col).unwrap_or("");
            let value = cell.parse::<i64>().map_err(|_| LoadError::InvalidValue {
                path: source.to_path_buf(),
                line,
                column: headers.get(col).unwrap_or("").to_string(),
                value: cell.to_string(),
            })?;
            values.push(value);
        }

        let key = region.full_name.clone();
        if !dataset.insert(key.clone(), region, values) {
            tracing::warn!(
                file = %source.display(),
                line,
                region = %key,
                "duplicate region row skipped"
            );
        }
    }

    tracing::debug!(
        file = %source.display(),
        ?layout,
        regions = dataset.len(),
        days = dataset.dates().len(),
        "loaded snapshot"
    );

    Ok(dataset)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Snapshots re-saved from Excel carry a BOM before `Province/State` / `UID`.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_identity_columns(layout: ColumnLayout, header_map: &HashMap<String, usize>) -> Result<IdentityColumns, String> {
    let [subdivision, name, latitude, longitude] = layout.identity_columns();
    let find = |col: &str| {
        header_map
            .get(col)
            .copied()
            .ok_or_else(|| format!("missing required column `{col}` ({layout:?} layout)"))
    };
    Ok(IdentityColumns {
        subdivision: find(subdivision)?,
        name: find(name)?,
        latitude: find(latitude)?,
        longitude: find(longitude)?,
    })
}

fn parse_region(record: &StringRecord, cols: IdentityColumns) -> Region {
    let subdivision = record.get(cols.subdivision).map(str::to_string);
    let name = record.get(cols.name).unwrap_or("");
    let latitude = parse_coordinate(record.get(cols.latitude));
    let longitude = parse_coordinate(record.get(cols.longitude));
    Region::new(subdivision, name, latitude, longitude)
}

fn parse_coordinate(s: Option<&str>) -> f64 {
    s.and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_date_header(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date column '{s}' (expected m/d/yy): {e}"))
}

fn format_error(source: &Path, reason: impl Into<String>) -> LoadError {
    LoadError::Format {
        path: source.to_path_buf(),
        reason: reason.into(),
    }
}
