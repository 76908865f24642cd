use crate::config::ImageFormat;
use crate::model::SeriesStats;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

const CHART_SIZE: (u32, u32) = (1200, 600);

const PROTOCOL_BLUE: RGBColor = RGBColor(31, 119, 180);
const MEAN_GREEN: RGBColor = RGBColor(0, 128, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartStyle {
    /// Red line with markers, no reference lines.
    Events,
    /// Blue line with markers plus mean line and ±1σ band.
    Protocol,
}

/// Everything needed to draw one series, independent of the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub style: ChartStyle,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series_label: String,
    /// (seconds, count) in ascending time order.
    pub points: Vec<(f64, f64)>,
    pub stats: Option<SeriesStats>,
}

impl ChartSpec {
    /// Horizontal extent of the data itself.
    pub fn data_x_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?.0;
        let (lo, hi) = self
            .points
            .iter()
            .fold((first, first), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
        Some((lo, hi))
    }

    /// Axis range with a small margin; a single instant still gets a visible width.
    pub fn x_range(&self) -> Range<f64> {
        let (lo, hi) = self.data_x_range().unwrap_or((0.0, 1.0));
        let span = hi - lo;
        if span > 0.0 {
            let pad = span * 0.02;
            (lo - pad)..(hi + pad)
        } else {
            let pad = lo.abs().max(1.0) * 0.05;
            (lo - pad)..(hi + pad)
        }
    }

    /// Count axis: starts at zero (or the band's floor) and leaves headroom.
    pub fn y_range(&self) -> Range<f64> {
        let mut hi = self.points.iter().map(|&(_, y)| y).fold(0.0, f64::max);
        let mut lo = 0.0f64;
        if let Some(stats) = &self.stats {
            hi = hi.max(stats.mean);
            if let Some((band_lo, band_hi)) = stats.band() {
                lo = lo.min(band_lo);
                hi = hi.max(band_hi);
            }
        }
        let hi = (hi * 1.1).max(1.0);
        lo..hi
    }
}

/// Whether charts in `format` can carry text in this build.
///
/// SVG keeps text as markup. Bitmap text needs a real font backend, which
/// plotters only has with the `ttf` feature; its fallback panics on any
/// text, so bitmap charts are drawn without caption, axis labels or legend.
pub fn supports_text(format: ImageFormat) -> bool {
    match format {
        ImageFormat::Svg => true,
        ImageFormat::Png => cfg!(feature = "ttf"),
    }
}

/// Draw one chart to `path` in the requested image format.
pub fn render_chart(path: &Path, format: ImageFormat, spec: &ChartSpec) -> anyhow::Result<()> {
    let with_text = supports_text(format);
    if !with_text {
        debug!(path = %path.display(), "no font backend, drawing chart without text");
    }
    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(&root, spec, with_text)?;
            root.present()?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(&root, spec, with_text)?;
            root.present()?;
        }
    }
    Ok(())
}

fn draw_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    with_text: bool,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let x_range = spec.x_range();
    let y_range = spec.y_range();

    // Label areas of size zero are never created, so no tick text is drawn.
    let mut builder = ChartBuilder::on(root);
    builder.margin(20);
    if with_text {
        builder
            .caption(&spec.title, ("sans-serif", 24))
            .x_label_area_size(45)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_range.clone(), y_range)?;

    let mut mesh = chart.configure_mesh();
    if with_text {
        mesh.x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str());
    }
    mesh.draw()?;

    if let (Some(stats), Some((data_lo, data_hi))) = (&spec.stats, spec.data_x_range()) {
        let band = match (stats.band(), stats.std_dev) {
            (Some((band_lo, band_hi)), Some(sd)) => Some((
                Rectangle::new(
                    [(data_lo, band_lo), (data_hi, band_hi)],
                    MEAN_GREEN.mix(0.2).filled(),
                ),
                format!("Std Dev: {:.2}", sd),
            )),
            _ => None,
        };
        let band_label = band
            .as_ref()
            .map_or_else(|| "Std Dev: n/a".to_string(), |(_, label)| label.clone());

        // With fewer than two bins the legend still names the std dev.
        chart
            .draw_series(band.map(|(rect, _)| rect))?
            .label(band_label)
            .legend(|(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], MEAN_GREEN.mix(0.2).filled())
            });

        let mean = stats.mean;
        chart
            .draw_series(LineSeries::new(
                vec![(x_range.start, mean), (x_range.end, mean)],
                MEAN_GREEN.stroke_width(2),
            ))?
            .label(format!("Mean: {:.2}", mean))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &MEAN_GREEN));
    }

    let color = match spec.style {
        ChartStyle::Events => RED,
        ChartStyle::Protocol => PROTOCOL_BLUE,
    };

    chart
        .draw_series(LineSeries::new(
            spec.points.iter().copied(),
            color.stroke_width(2),
        ))?
        .label(spec.series_label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

    chart.draw_series(
        spec.points
            .iter()
            .map(|&p| Circle::new(p, 3, color.filled())),
    )?;

    if with_text && spec.style == ChartStyle::Protocol {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    Ok(())
}
