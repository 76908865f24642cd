use crate::time::formats::{DateTimeParser, parse_number};
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    /// Already numeric (epoch seconds or seconds since capture start).
    Numeric,
    /// Date/time text converted to seconds.
    DateTime,
}

/// How date/time entries are reduced to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimePrecision {
    /// Truncate each instant to its epoch second, so bins follow the
    /// wall clock rather than the sub-second phase of the first event.
    WholeSeconds,
    /// Keep the full nanosecond offset from the earliest instant.
    Nanoseconds,
}

/// A parsed `Time` column, one entry per input row.
#[derive(Debug, Clone)]
pub struct TimeColumn {
    pub kind: TimeKind,
    /// Seconds; None for entries that could not be parsed.
    /// For date/time columns these are relative to `epoch_base`.
    pub values: Vec<Option<f64>>,
    /// Earliest parsed instant of a date/time column.
    pub epoch_base: Option<DateTime<Utc>>,
}

impl TimeColumn {
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().flatten()
    }
}

enum Cell {
    Number(f64),
    Instant(DateTime<Utc>),
    Invalid,
}

/// Parse a column of heterogeneous timestamps.
///
/// The column is a date/time column as soon as one entry parses as a date;
/// otherwise it is numeric. Entries that do not fit the column kind become
/// None and are dropped by the aggregation step. Numeric entries are kept
/// as-is; `precision` only applies to date/time columns.
pub fn parse_column<'a, I>(
    raw: I,
    precision: DateTimePrecision,
) -> Result<TimeColumn, regex::Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let parser = DateTimeParser::new()?;
    let cells: Vec<Cell> = raw
        .into_iter()
        .map(|s| {
            if let Some(v) = parse_number(s) {
                Cell::Number(v)
            } else if let Some(dt) = parser.parse(s) {
                Cell::Instant(dt)
            } else {
                Cell::Invalid
            }
        })
        .collect();

    let epoch_base = cells
        .iter()
        .filter_map(|c| match c {
            Cell::Instant(dt) => Some(*dt),
            _ => None,
        })
        .min();

    let column = match epoch_base {
        None => TimeColumn {
            kind: TimeKind::Numeric,
            values: cells
                .iter()
                .map(|c| match c {
                    Cell::Number(v) => Some(*v),
                    _ => None,
                })
                .collect(),
            epoch_base: None,
        },
        Some(base) => TimeColumn {
            kind: TimeKind::DateTime,
            values: cells
                .iter()
                .map(|c| match c {
                    Cell::Instant(dt) => match precision {
                        DateTimePrecision::WholeSeconds => {
                            Some((dt.timestamp() - base.timestamp()) as f64)
                        }
                        DateTimePrecision::Nanoseconds => seconds_since(base, *dt),
                    },
                    _ => None,
                })
                .collect(),
            epoch_base: Some(base),
        },
    };

    debug!(
        kind = ?column.kind,
        precision = ?precision,
        rows = column.values.len(),
        valid = column.valid_count(),
        "parsed time column"
    );
    Ok(column)
}

/// Nanosecond-exact difference, falling back to microseconds for spans
/// too wide for an i64 nanosecond count.
fn seconds_since(base: DateTime<Utc>, dt: DateTime<Utc>) -> Option<f64> {
    let delta = dt - base;
    match delta.num_nanoseconds() {
        Some(ns) => Some(ns as f64 / 1e9),
        None => delta.num_microseconds().map(|us| us as f64 / 1e6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn numeric_column_drops_non_numbers() {
        let col = parse_column(["0.5", "", "abc", "2.25"], DateTimePrecision::WholeSeconds).unwrap();

        assert_eq!(col.kind, TimeKind::Numeric);
        assert_eq!(col.values, vec![Some(0.5), None, None, Some(2.25)]);
        assert_eq!(col.epoch_base, None);
        assert_eq!(col.valid_count(), 2);
    }

    #[test]
    fn datetime_column_is_relative_to_earliest() {
        let col = parse_column(
            [
                "2025-03-30 10:00:01.500",
                "garbage",
                "2025-03-30 10:00:00",
                "17",
            ],
            DateTimePrecision::Nanoseconds,
        )
        .unwrap();

        assert_eq!(col.kind, TimeKind::DateTime);
        assert_eq!(col.values, vec![Some(1.5), None, Some(0.0), None]);
        assert_eq!(
            col.epoch_base,
            Some(Utc.with_ymd_and_hms(2025, 3, 30, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn sub_second_precision_survives_epoch_magnitudes() {
        let col = parse_column(
            [
                "Mar 30, 2025 14:22:01.000000001 IDT",
                "Mar 30, 2025 14:22:01.000001000 IDT",
            ],
            DateTimePrecision::Nanoseconds,
        )
        .unwrap();

        assert_eq!(col.get(0), Some(0.0));
        assert_eq!(col.get(1), Some(0.000000999));
    }

    #[test]
    fn whole_seconds_follow_the_wall_clock() {
        let col = parse_column(
            [
                "2025-03-30 10:00:00.900",
                "2025-03-30 10:00:01.100",
                "2025-03-30 10:00:01.800",
            ],
            DateTimePrecision::WholeSeconds,
        )
        .unwrap();

        assert_eq!(col.values, vec![Some(0.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn numeric_values_keep_fractions_at_whole_second_precision() {
        let col = parse_column(["0.9", "1.1"], DateTimePrecision::WholeSeconds).unwrap();
        assert_eq!(col.values, vec![Some(0.9), Some(1.1)]);
    }

    #[test]
    fn all_invalid_yields_no_values() {
        let col = parse_column(["", "n/a", "--"], DateTimePrecision::Nanoseconds).unwrap();
        assert_eq!(col.valid_count(), 0);
        assert_eq!(col.get(0), None);
        assert_eq!(col.get(99), None);
    }
}
