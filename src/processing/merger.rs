//! Multi-source merger

use crate::types::{Sample, Series};

/// No source contributed a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no source contributed any rows")]
pub struct EmptyDataset;

/// Concatenate per-source samples in source order, then stable-sort by time.
///
/// Samples sharing a timestamp keep source order, then row order.
pub fn merge(parts: Vec<Vec<Sample>>) -> Result<Series, EmptyDataset> {
    let total: usize = parts.iter().map(Vec::len).sum();
    if total == 0 {
        return Err(EmptyDataset);
    }
    let mut all = Vec::with_capacity(total);
    for part in parts {
        all.extend(part);
    }
    Ok(Series::from_unsorted(all))
}
