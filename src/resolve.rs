//! Map a user query to a dataset key.

use crate::domain::Dataset;

/// Resolve `query` to a key of `dataset`.
///
/// An exact key match wins. Otherwise the first entry (in insertion order, i.e.
/// file order followed by aggregates) whose subdivision equals `query` is used,
/// so `"Bavaria"` finds `"Germany Bavaria"`. When several parents share a
/// subdivision name the earliest row wins.
///
/// Returns `None` when nothing matches; callers report and skip the query.
pub fn resolve_region<'a>(dataset: &'a Dataset, query: &str) -> Option<&'a str> {
    if let Some(key) = dataset.key(query) {
        return Some(key);
    }

    dataset
        .iter()
        .find(|(_, series)| series.region.subdivision.as_deref() == Some(query))
        .map(|(key, _)| key)
}
