//! Synthetic parent-region totals.
//!
//! Snapshot files mix granularities: most countries report a single row, but
//! some only report per province (and the US files only per county). To make
//! every parent queryable we sum its subdivision rows into an extra series.
//!
//! Accumulation happens under an internal placeholder key `"<name> ALL"`. Once
//! every row has been folded in, each aggregate is published under the bare
//! parent name, unless the file already has a top-level row with that name, in
//! which case it stays under the placeholder key so the genuine row survives.
//!
//! Sums use checked arithmetic: a parent whose total would overflow `i64` gets
//! no aggregate at all and is listed in the summary instead.

use crate::domain::{Dataset, RegionSeries};

const PLACEHOLDER_SUFFIX: &str = " ALL";

/// What `aggregate_subdivisions` added to a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Keys of aggregates published under the bare parent name.
    pub published: Vec<String>,
    /// Keys of aggregates kept under the placeholder because the bare name was taken.
    pub collided: Vec<String>,
    /// Parent names whose summed values overflowed; no aggregate was added.
    pub overflowed: Vec<String>,
}

struct PendingTotal {
    placeholder: String,
    total: RegionSeries,
    overflowed: bool,
}

/// Add one summed series per parent that has at least one subdivision row.
///
/// Existing entries are never modified: every aggregate starts from an owned
/// copy of its first subdivision's region and values.
pub fn aggregate_subdivisions(dataset: &mut Dataset) -> AggregateSummary {
    let mut pending: Vec<PendingTotal> = Vec::new();

    for (_, series) in dataset.iter() {
        if series.region.subdivision.is_none() {
            continue;
        }
        let placeholder = format!("{}{PLACEHOLDER_SUFFIX}", series.region.name);
        match pending.iter_mut().find(|p| p.placeholder == placeholder) {
            Some(p) if p.overflowed => {}
            Some(p) => {
                let sums: Option<Vec<i64>> = p
                    .total
                    .values
                    .iter()
                    .zip(&series.values)
                    .map(|(acc, v)| acc.checked_add(*v))
                    .collect();
                match sums {
                    Some(values) => p.total.values = values,
                    None => p.overflowed = true,
                }
            }
            None => pending.push(PendingTotal {
                placeholder,
                total: RegionSeries {
                    region: series.region.summed(),
                    values: series.values.clone(),
                },
                overflowed: false,
            }),
        }
    }

    let mut summary = AggregateSummary::default();
    for PendingTotal {
        placeholder,
        total,
        overflowed,
    } in pending
    {
        let bare = placeholder
            .strip_suffix(PLACEHOLDER_SUFFIX)
            .unwrap_or(&placeholder)
            .to_string();

        if overflowed {
            tracing::warn!(region = %bare, "subdivision totals overflow, aggregate dropped");
            summary.overflowed.push(bare);
            continue;
        }

        let key = if dataset.contains(&bare) {
            tracing::debug!(region = %bare, "top-level row exists, keeping aggregate under placeholder key");
            summary.collided.push(placeholder.clone());
            placeholder
        } else {
            summary.published.push(bare.clone());
            bare
        };

        if !dataset.insert(key.clone(), total.region, total.values) {
            tracing::warn!(region = %key, "aggregate key already taken, aggregate dropped");
        }
    }

    summary
}
