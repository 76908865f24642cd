//! Aggregation model: anchor timestamps, window them, and count rows per bin.

pub mod stats;

pub use stats::SeriesStats;

use crate::config::{Resolution, TimeWindow};
use std::collections::BTreeMap;
use tracing::debug;

/// Extracts the category (protocol) of a row; None excludes the row.
pub type CategoryFn<'f, R> = &'f dyn Fn(&R) -> Option<&str>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    pub resolution: Resolution,
    /// Rows whose offset exceeds the window are excluded before binning.
    pub window: Option<TimeWindow>,
}

impl Binning {
    pub fn per_second() -> Self {
        Self {
            resolution: Resolution::Seconds,
            window: None,
        }
    }

    /// Bin index for a non-negative offset in seconds.
    pub fn bin_of(&self, offset: f64) -> u64 {
        // `as` saturates, and offsets are never negative after anchoring.
        (offset * self.resolution.multiplier()).floor() as u64
    }

    /// Left edge of a bin, in seconds.
    pub fn seconds_of(&self, bin: u64) -> f64 {
        bin as f64 / self.resolution.multiplier()
    }
}

/// Counts per occupied bin for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// None for the single series of an ungrouped run.
    pub category: Option<String>,
    pub bins: BTreeMap<u64, u64>,
}

impl Series {
    pub fn total(&self) -> u64 {
        self.bins.values().sum()
    }

    /// (seconds, count) pairs in bin order.
    pub fn points(&self, binning: &Binning) -> Vec<(f64, u64)> {
        self.bins
            .iter()
            .map(|(&bin, &count)| (binning.seconds_of(bin), count))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub binning: Binning,
    pub total_rows: usize,
    /// Rows with a parseable timestamp (and category, when grouping).
    pub valid_rows: usize,
    /// Valid rows inside the time window.
    pub windowed_rows: usize,
    /// Raw time value mapped to offset 0.
    pub anchor: Option<f64>,
    /// One entry per category, ordered by label.
    pub series: Vec<Series>,
}

impl Aggregation {
    pub fn has_bins(&self) -> bool {
        self.series.iter().any(|s| !s.bins.is_empty())
    }
}

/// Group rows into fixed-width time bins and count them, per category.
///
/// 1) Drop rows without a timestamp, or without a category when grouping.
/// 2) Anchor at the earliest remaining timestamp so it maps to offset 0.
/// 3) Drop rows past the time window, if any.
/// 4) Count rows per (category, floor(offset * multiplier)).
pub fn aggregate<R>(
    rows: &[R],
    time_of: impl Fn(usize, &R) -> Option<f64>,
    category_of: Option<CategoryFn<'_, R>>,
    binning: Binning,
) -> Aggregation {
    let mut valid: Vec<(f64, Option<&str>)> = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let Some(t) = time_of(idx, row) else {
            continue;
        };
        let category = match category_of {
            Some(f) => match f(row) {
                Some(c) => Some(c),
                None => continue,
            },
            None => None,
        };
        valid.push((t, category));
    }

    let anchor = valid.iter().map(|(t, _)| *t).reduce(f64::min);

    let mut grouped: BTreeMap<Option<&str>, BTreeMap<u64, u64>> = BTreeMap::new();
    let mut windowed_rows = 0usize;
    if let Some(anchor) = anchor {
        for (t, category) in &valid {
            let offset = t - anchor;
            if binning.window.is_some_and(|w| !w.contains(offset)) {
                continue;
            }
            windowed_rows += 1;
            *grouped
                .entry(*category)
                .or_default()
                .entry(binning.bin_of(offset))
                .or_insert(0) += 1;
        }
    }

    let series: Vec<Series> = grouped
        .into_iter()
        .map(|(category, bins)| Series {
            category: category.map(str::to_string),
            bins,
        })
        .collect();

    debug!(
        total = rows.len(),
        valid = valid.len(),
        windowed = windowed_rows,
        series = series.len(),
        resolution = %binning.resolution,
        "aggregated rows"
    );

    Aggregation {
        binning,
        total_rows: rows.len(),
        valid_rows: valid.len(),
        windowed_rows,
        anchor,
        series,
    }
}
