//! Date/time text forms seen in firewall and Wireshark exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Naive layouts, tried in order. Values are interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
    "%b %d, %Y %H:%M:%S%.f",
];

/// Wireshark "Absolute date and time": `Mar 30, 2025 14:22:01.123456789 IDT`.
/// The zone is a free-form abbreviation that chrono cannot resolve, so it is
/// stripped and the wall-clock time is taken as-is.
const WIRESHARK_ABSOLUTE_RE: &str =
    r"^([A-Z][a-z]{2}\s+\d{1,2},\s+\d{4}\s+\d{1,2}:\d{2}:\d{2}(?:\.\d+)?)(?:\s+[A-Za-z][A-Za-z0-9+\-:]*)?$";

/// Date/time cell parser. Holds the compiled Wireshark pattern so a column
/// is parsed against one regex instance.
#[derive(Debug, Clone)]
pub struct DateTimeParser {
    wireshark_absolute: Regex,
}

impl DateTimeParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            wireshark_absolute: Regex::new(WIRESHARK_ABSOLUTE_RE)?,
        })
    }

    /// Parse a date/time cell into a UTC instant.
    pub fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
            return Some(dt.with_timezone(&Utc));
        }

        let naive_text = self
            .wireshark_absolute
            .captures(s)
            .and_then(|caps| caps.get(1))
            .map_or(s, |m| m.as_str());
        // Wireshark pads single-digit days with a space ("Mar  3, 2025").
        let collapsed = naive_text.split_whitespace().collect::<Vec<_>>().join(" ");

        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&collapsed, fmt) {
                return Some(naive.and_utc());
            }
        }

        NaiveDate::parse_from_str(&collapsed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// Parse a numeric cell. Only finite values are valid timestamps.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
