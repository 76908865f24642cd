//! The two report runs: events per second, and packets per bin per protocol.
//!
//! Each run is one linear pass: load -> normalize -> aggregate -> render.
//! Empty intermediate results end the run early with an `Outcome` instead
//! of an error; only malformed input propagates as `Err`.

use crate::Result;
use crate::config::{EventsConfig, OutputConfig, ProtocolsConfig};
use crate::model::{self, Binning, Series, SeriesStats};
use crate::render::{self, ChartEntry, ChartSpec, ChartStyle, ReportData};
use crate::table::{self, Table};
use crate::time::{self, DateTimePrecision, TimeColumn, TimeKind};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenChart {
    /// Protocol label; None for the events chart.
    pub label: Option<String>,
    pub path: PathBuf,
    pub stats: SeriesStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No row had a usable timestamp (and protocol, when required).
    NoValidData,
    /// Valid rows existed but none survived windowing into a bin.
    NoEventsAfterGrouping,
    Written {
        charts: Vec<WrittenChart>,
        report: Option<PathBuf>,
    },
}

/// Load the table and parse its time column; both runs start this way.
fn load(
    input: &Path,
    opts: &table::TableOptions,
    precision: DateTimePrecision,
) -> Result<(Table, TimeColumn)> {
    let table = table::load_table(input, opts)
        .with_context(|| format!("load input table {}", input.display()))?;
    if table.is_empty() {
        warn!(input = %input.display(), "input has a header but no data rows");
    }
    let times = time::parse_column(table.rows.iter().map(|r| r.time.as_str()), precision)
        .context("compile date/time patterns")?;

    for (row, value) in table.rows.iter().zip(&times.values) {
        if value.is_none() {
            debug!(line = row.line, time = %row.time, "dropping row with unparseable time");
        }
    }

    info!(
        input = %input.display(),
        rows = table.len(),
        valid_times = times.valid_count(),
        kind = ?times.kind,
        epoch_base = ?times.epoch_base,
        "loaded input"
    );
    Ok((table, times))
}

pub fn run_events(cfg: &EventsConfig) -> Result<Outcome> {
    let (table, times) = load(&cfg.input, &cfg.table, DateTimePrecision::WholeSeconds)?;

    let agg = model::aggregate(&table.rows, |i, _| times.get(i), None, Binning::per_second());
    debug!(anchor = ?agg.anchor, "first event anchors offset 0");
    if agg.valid_rows == 0 {
        return Ok(Outcome::NoValidData);
    }
    if !agg.has_bins() {
        return Ok(Outcome::NoEventsAfterGrouping);
    }

    let out_dir = render::ensure_out_dir(&cfg.output.dir)?;
    let stem = render::input_stem(&cfg.input);

    let mut charts = Vec::new();
    for series in &agg.series {
        let Some(stats) = SeriesStats::from_series(series) else {
            continue;
        };
        let spec = ChartSpec {
            style: ChartStyle::Events,
            title: cfg.title.clone(),
            x_label: "Time (seconds)".to_string(),
            y_label: "Number of Events".to_string(),
            series_label: "Events".to_string(),
            points: chart_points(series, &agg.binning),
            stats: None,
        };
        let path = out_dir.join(render::events_chart_name(&stem, cfg.output.format));
        write_chart(&path, &cfg.output, &spec)?;
        charts.push(WrittenChart {
            label: None,
            path,
            stats,
        });
    }

    let report = write_report(
        &cfg.output,
        &out_dir,
        &stem,
        "events",
        ReportData {
            title: format!("{}: {}", stem, cfg.title),
            input: cfg.input.display().to_string(),
            time_kind: kind_name(times.kind).to_string(),
            resolution: agg.binning.resolution.to_string(),
            window_sec: None,
            total_rows: agg.total_rows,
            valid_rows: agg.valid_rows,
            windowed_rows: agg.windowed_rows,
            charts: chart_entries(&charts),
        },
    )?;

    Ok(Outcome::Written { charts, report })
}

pub fn run_protocols(cfg: &ProtocolsConfig) -> Result<Outcome> {
    let (table, times) = load(&cfg.input, &cfg.table, DateTimePrecision::Nanoseconds)?;

    let binning = Binning {
        resolution: cfg.resolution,
        window: Some(cfg.window),
    };
    let agg = model::aggregate(
        &table.rows,
        |i, _| times.get(i),
        Some(&Table::protocol_of),
        binning,
    );
    debug!(anchor = ?agg.anchor, "first event anchors offset 0");
    if agg.valid_rows == 0 {
        return Ok(Outcome::NoValidData);
    }
    if !agg.has_bins() {
        return Ok(Outcome::NoEventsAfterGrouping);
    }

    let out_dir = render::ensure_out_dir(&cfg.output.dir)?;
    let stem = render::input_stem(&cfg.input);
    let res = cfg.resolution.token();
    let res_upper = res.to_uppercase();

    let mut names = render::OutputNames::default();
    let mut charts = Vec::new();
    for series in &agg.series {
        let Some(stats) = SeriesStats::from_series(series) else {
            continue;
        };
        let proto = series.category.clone().unwrap_or_default();
        debug!(protocol = %proto, packets = series.total(), bins = stats.bins, "charting protocol");
        let spec = ChartSpec {
            style: ChartStyle::Protocol,
            title: format!(
                "{} Packets per {} bin (0 - {} sec)",
                proto, res_upper, cfg.window
            ),
            x_label: "Time (seconds)".to_string(),
            y_label: format!("Packets per {} bin", res_upper),
            series_label: format!("{} packets per {} bin", proto, res),
            points: chart_points(series, &agg.binning),
            stats: Some(stats),
        };
        let path = out_dir.join(names.claim(render::protocol_chart_name(
            &stem,
            &proto,
            cfg.resolution,
            cfg.window,
            cfg.output.format,
        )));
        write_chart(&path, &cfg.output, &spec)?;
        charts.push(WrittenChart {
            label: Some(proto),
            path,
            stats,
        });
    }

    let report = write_report(
        &cfg.output,
        &out_dir,
        &stem,
        "protocols",
        ReportData {
            title: format!("{}: packets per {} bin (0 - {} sec)", stem, res, cfg.window),
            input: cfg.input.display().to_string(),
            time_kind: kind_name(times.kind).to_string(),
            resolution: res.to_string(),
            window_sec: Some(cfg.window.seconds()),
            total_rows: agg.total_rows,
            valid_rows: agg.valid_rows,
            windowed_rows: agg.windowed_rows,
            charts: chart_entries(&charts),
        },
    )?;

    Ok(Outcome::Written { charts, report })
}

fn chart_points(series: &Series, binning: &Binning) -> Vec<(f64, f64)> {
    series
        .points(binning)
        .into_iter()
        .map(|(t, count)| (t, count as f64))
        .collect()
}

fn write_chart(path: &Path, output: &OutputConfig, spec: &ChartSpec) -> Result<()> {
    render::render_chart(path, output.format, spec)
        .with_context(|| format!("render chart {}", path.display()))?;
    info!(path = %path.display(), points = spec.points.len(), "wrote chart");
    Ok(())
}

fn write_report(
    output: &OutputConfig,
    out_dir: &Path,
    stem: &str,
    kind: &str,
    data: ReportData,
) -> Result<Option<PathBuf>> {
    if !output.html {
        return Ok(None);
    }
    let html = render::render_html_report(&data)?;
    let path = out_dir.join(render::report_name(stem, kind));
    fs::write(&path, html).with_context(|| format!("write report {}", path.display()))?;
    info!(path = %path.display(), "wrote report");
    Ok(Some(path))
}

fn chart_entries(charts: &[WrittenChart]) -> Vec<ChartEntry> {
    charts
        .iter()
        .map(|c| ChartEntry {
            label: c.label.clone().unwrap_or_else(|| "events".to_string()),
            file: c
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bins: c.stats.bins,
            total: c.stats.total,
            mean: c.stats.mean,
            std_dev: c.stats.std_dev,
        })
        .collect()
}

fn kind_name(kind: TimeKind) -> &'static str {
    match kind {
        TimeKind::Numeric => "numeric",
        TimeKind::DateTime => "date/time",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageFormat, Resolution, TimeWindow};
    use crate::model::Aggregation;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    fn protocols_cfg(dir: &TempDir, input: PathBuf, res: Resolution, window: f64) -> ProtocolsConfig {
        let mut cfg = ProtocolsConfig::new(input, res, TimeWindow::new(window).unwrap());
        cfg.output.dir = dir.path().join("output_graphs");
        cfg
    }

    fn protocol_series(cfg: &ProtocolsConfig) -> Aggregation {
        let (table, times) = load(&cfg.input, &cfg.table, DateTimePrecision::Nanoseconds).unwrap();
        model::aggregate(
            &table.rows,
            |i, _| times.get(i),
            Some(&Table::protocol_of),
            Binning {
                resolution: cfg.resolution,
                window: Some(cfg.window),
            },
        )
    }

    #[test]
    fn events_without_valid_times_write_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "fw.csv", "Time,Action\nnot-a-time,drop\n,allow\n");
        let mut cfg = EventsConfig::new(input);
        cfg.output.dir = dir.path().join("output_graphs");

        assert_eq!(run_events(&cfg).unwrap(), Outcome::NoValidData);
        assert!(!cfg.output.dir.exists());
    }

    #[test]
    fn datetime_events_bin_by_wall_clock_second() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "fw.csv",
            "Time,Action\n\
             2025-03-30 10:00:00.900,drop\n\
             2025-03-30 10:00:01.100,allow\n\
             2025-03-30 10:00:01.800,drop\n",
        );
        let mut cfg = EventsConfig::new(input);
        cfg.output.dir = dir.path().join("output_graphs");

        let (table, times) = load(&cfg.input, &cfg.table, DateTimePrecision::WholeSeconds).unwrap();
        let agg = model::aggregate(&table.rows, |i, _| times.get(i), None, Binning::per_second());
        assert_eq!(agg.series[0].bins, BTreeMap::from([(0, 1), (1, 2)]));

        let Outcome::Written { charts, .. } = run_events(&cfg).unwrap() else {
            panic!("expected a chart");
        };
        assert_eq!(charts[0].stats.bins, 2);
        assert_eq!(charts[0].stats.total, 3);
    }

    #[test]
    fn protocols_without_protocol_values_write_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "cap.csv", "Time,Protocol\n0.1,\n0.2,\n");
        let cfg = protocols_cfg(&dir, input, Resolution::Seconds, 10.0);

        assert_eq!(run_protocols(&cfg).unwrap(), Outcome::NoValidData);
        assert!(!cfg.output.dir.exists());
    }

    #[test]
    fn protocol_series_split_by_protocol() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "response.csv",
            "\"No.\",\"Time\",\"Protocol\"\n\
             1,0.100,TCP\n\
             2,0.200,UDP\n\
             3,1.400,TCP\n\
             4,1.900,UDP\n\
             5,bogus,TCP\n\
             6,12.000,TCP\n",
        );
        let cfg = protocols_cfg(&dir, input, Resolution::Seconds, 10.0);

        let agg = protocol_series(&cfg);
        assert_eq!(agg.total_rows, 6);
        assert_eq!(agg.valid_rows, 5);
        assert_eq!(agg.windowed_rows, 4);

        let by_label: BTreeMap<String, BTreeMap<u64, u64>> = agg
            .series
            .into_iter()
            .map(|s| (s.category.unwrap(), s.bins))
            .collect();
        assert_eq!(by_label["TCP"], BTreeMap::from([(0, 1), (1, 1)]));
        assert_eq!(by_label["UDP"], BTreeMap::from([(0, 1), (1, 1)]));
    }

    #[test]
    fn sanitized_label_collisions_keep_both_charts() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "cap.csv",
            "Time,Protocol\n0.1,HTTP/JSON\n0.2,HTTP_JSON\n1.3,HTTP_JSON\n",
        );
        let mut cfg = protocols_cfg(&dir, input, Resolution::Seconds, 10.0);
        cfg.output.format = ImageFormat::Svg;

        let Outcome::Written { charts, .. } = run_protocols(&cfg).unwrap() else {
            panic!("expected charts");
        };
        assert_eq!(charts.len(), 2);
        assert_ne!(charts[0].path, charts[1].path);
        assert!(charts.iter().all(|c| c.path.is_file()));
    }

    #[test]
    fn missing_protocol_column_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "cap.csv", "Time,Source\n0.1,10.0.0.1\n");
        let cfg = protocols_cfg(&dir, input, Resolution::Seconds, 10.0);

        let err = run_protocols(&cfg).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Protocol"), "{}", chain);
        assert!(matches!(
            err.downcast_ref::<table::error::TableError>(),
            Some(table::error::TableError::MissingColumn { .. })
        ));
    }

    #[test]
    fn report_entries_use_file_names() {
        let charts = vec![WrittenChart {
            label: Some("DNS".to_string()),
            path: PathBuf::from("out/cap_DNS_packets_per_s_up_to_10.0_sec.png"),
            stats: SeriesStats::from_counts([2, 2]).unwrap(),
        }];
        let entries = chart_entries(&charts);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file, "cap_DNS_packets_per_s_up_to_10.0_sec.png");
        assert_eq!(entries[0].mean, 2.0);
        assert_eq!(entries[0].std_dev, Some(0.0));
    }
}
