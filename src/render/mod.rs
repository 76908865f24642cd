//! Chart and report rendering, plus deterministic output naming.

pub mod chart;
pub mod html;

pub use chart::{ChartSpec, ChartStyle, render_chart};
pub use html::{ChartEntry, ReportData, render_html_report};

use crate::config::{ImageFormat, Resolution, TimeWindow};
use anyhow::Context;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name up to its first '.', e.g. `capture.2025.csv` -> `capture`.
pub fn input_stem(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        "input".to_string()
    } else {
        stem.to_string()
    }
}

/// Make a category label safe to embed in a file name.
pub fn sanitize_label(label: &str) -> String {
    let out: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        out
    }
}

pub fn events_chart_name(stem: &str, format: ImageFormat) -> String {
    format!("{}_events_per_second.{}", stem, format.extension())
}

pub fn protocol_chart_name(
    stem: &str,
    protocol: &str,
    resolution: Resolution,
    window: TimeWindow,
    format: ImageFormat,
) -> String {
    format!(
        "{}_{}_packets_per_{}_up_to_{}_sec.{}",
        stem,
        sanitize_label(protocol),
        resolution,
        window,
        format.extension()
    )
}

pub fn report_name(stem: &str, kind: &str) -> String {
    format!("{}_{}_report.html", stem, kind)
}

/// File names handed out during one run.
///
/// Sanitizing can map distinct labels (`HTTP/JSON`, `HTTP_JSON`) to one
/// name; later claims get `_2`, `_3`, ... before the extension.
#[derive(Debug, Default)]
pub struct OutputNames {
    taken: BTreeSet<String>,
}

impl OutputNames {
    pub fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }
        let (base, ext) = match name.rsplit_once('.') {
            Some((base, ext)) => (base, format!(".{}", ext)),
            None => (name.as_str(), String::new()),
        };
        let mut n = 2u32;
        loop {
            let candidate = format!("{}_{}{}", base, n, ext);
            if self.taken.insert(candidate.clone()) {
                warn!(name = %name, renamed = %candidate, "output file name collision");
                return candidate;
            }
            n += 1;
        }
    }
}

/// Create the output directory if needed and return it.
pub fn ensure_out_dir(dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stem_stops_at_first_dot() {
        assert_eq!(input_stem(Path::new("/data/response.csv")), "response");
        assert_eq!(input_stem(Path::new("fw.export.2025.csv")), "fw");
        assert_eq!(input_stem(Path::new(".hidden")), "input");
    }

    #[test]
    fn labels_are_path_safe() {
        assert_eq!(sanitize_label("TLSv1.2"), "TLSv1.2");
        assert_eq!(sanitize_label("HTTP/JSON"), "HTTP_JSON");
        assert_eq!(sanitize_label(" GSM MAP "), "GSM_MAP");
        assert_eq!(sanitize_label(".."), "unknown");
    }

    #[test]
    fn chart_names_are_deterministic() {
        let window = TimeWindow::new(10.0).unwrap();
        assert_eq!(
            protocol_chart_name("response", "DNS", Resolution::Milliseconds, window, ImageFormat::Png),
            "response_DNS_packets_per_ms_up_to_10.0_sec.png"
        );
        assert_eq!(
            events_chart_name("firewall", ImageFormat::Svg),
            "firewall_events_per_second.svg"
        );
        assert_eq!(report_name("response", "protocols"), "response_protocols_report.html");
    }

    #[test]
    fn colliding_labels_get_distinct_names() {
        let window = TimeWindow::new(10.0).unwrap();
        let name = |proto| {
            protocol_chart_name("cap", proto, Resolution::Seconds, window, ImageFormat::Svg)
        };
        let mut names = OutputNames::default();

        let first = names.claim(name("HTTP/JSON"));
        let second = names.claim(name("HTTP_JSON"));
        let third = names.claim(name("HTTP JSON"));

        assert_eq!(first, "cap_HTTP_JSON_packets_per_s_up_to_10.0_sec.svg");
        assert_eq!(second, "cap_HTTP_JSON_packets_per_s_up_to_10.0_sec_2.svg");
        assert_eq!(third, "cap_HTTP_JSON_packets_per_s_up_to_10.0_sec_3.svg");
        assert_eq!(names.claim(name("DNS")), "cap_DNS_packets_per_s_up_to_10.0_sec.svg");
    }

    #[test]
    fn out_dir_creation_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("output_graphs");
        ensure_out_dir(&dir).unwrap();
        ensure_out_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
