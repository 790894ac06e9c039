//! Static Chart Renderer
//! Draws the three summary tables as PNG images with plotters.
//!
//! Layout:
//! 1. Monthly revenue: line chart with point markers, month labels rotated
//! 2. Revenue by region: bar chart
//! 3. Top products: bar chart, product names rotated and truncated

use crate::data::{Aggregates, CategorySeries};
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use polars::prelude::PolarsError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// Colors
const LINE_COLOR: RGBColor = RGBColor(91, 155, 213);
const BAR_COLOR: RGBColor = RGBColor(68, 114, 196);
const GRID_COLOR: RGBColor = RGBColor(220, 220, 220);

/// Longest category label drawn on an axis before it is cut with an ellipsis.
const MAX_LABEL_CHARS: usize = 28;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to draw {path}: {message}")]
    Draw { path: PathBuf, message: String },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
}

/// Fixed presentation of one chart, shared by the PNG and HTML renderers.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec {
    pub title: &'static str,
    /// File stem; `.png` and `.html` are appended by the renderers.
    pub stem: &'static str,
    pub kind: ChartKind,
    pub x_desc: &'static str,
    pub size: (u32, u32),
    pub rotate_labels: bool,
}

pub const MONTHLY_CHART: ChartSpec = ChartSpec {
    title: "Monthly Revenue",
    stem: "monthly",
    kind: ChartKind::Line,
    x_desc: "Month",
    size: (1000, 500),
    rotate_labels: true,
};

pub const REGION_CHART: ChartSpec = ChartSpec {
    title: "Revenue by Region",
    stem: "region",
    kind: ChartKind::Bar,
    x_desc: "Region",
    size: (800, 500),
    rotate_labels: false,
};

pub const PRODUCTS_CHART: ChartSpec = ChartSpec {
    title: "Top Products",
    stem: "products",
    kind: ChartKind::Bar,
    x_desc: "Product",
    size: (1000, 500),
    rotate_labels: true,
};

/// Charts in report order.
pub const CHARTS: [ChartSpec; 3] = [MONTHLY_CHART, REGION_CHART, PRODUCTS_CHART];

impl ChartSpec {
    pub fn png_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.png", self.stem))
    }

    pub fn html_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.html", self.stem))
    }
}

/// Pair each chart with the table it plots.
pub fn chart_series(aggregates: &Aggregates) -> Result<[(ChartSpec, CategorySeries); 3], PolarsError> {
    Ok([
        (MONTHLY_CHART, aggregates.monthly_series()?),
        (REGION_CHART, aggregates.region_series()?),
        (PRODUCTS_CHART, aggregates.product_series()?),
    ])
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Write `monthly.png`, `region.png` and `products.png` into `output_dir`.
    pub fn render_all(aggregates: &Aggregates, output_dir: &Path) -> Result<Vec<PathBuf>, ChartError> {
        let mut paths = Vec::with_capacity(CHARTS.len());
        for (spec, series) in chart_series(aggregates)? {
            let path = spec.png_path(output_dir);
            Self::render_png(&spec, &series, &path)?;
            info!("chart saved: {}", path.display());
            paths.push(path);
        }
        Ok(paths)
    }

    /// Draw a single chart to `path`, overwriting it.
    pub fn render_png(spec: &ChartSpec, series: &CategorySeries, path: &Path) -> Result<(), ChartError> {
        let draw_err = |e: &dyn std::fmt::Display| ChartError::Draw {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let root = BitMapBackend::new(path, spec.size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| draw_err(&e))?;

        let n = series.len().max(1);
        let (y_min, y_max) = Self::get_y_range(series);
        let label_area = if spec.rotate_labels { 170 } else { 45 };
        debug!("{}: {} points, y in [{}, {}]", spec.stem, series.len(), y_min, y_max);

        let mut chart = ChartBuilder::on(&root)
            .caption(spec.title, ("sans-serif", 26))
            .margin(15)
            .x_label_area_size(label_area)
            .y_label_area_size(85)
            .build_cartesian_2d((0..n).into_segmented(), y_min..y_max)
            .map_err(|e| draw_err(&e))?;

        let labels = &series.labels;
        let x_formatter = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels
                .get(*i)
                .map(|l| truncate_label(l, MAX_LABEL_CHARS))
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };
        let y_formatter = |y: &f64| format!("{:.0}", y);

        let label_style = if spec.rotate_labels {
            ("sans-serif", 13).into_font().transform(FontTransform::Rotate90)
        } else {
            ("sans-serif", 14).into_font()
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(&GRID_COLOR)
            .x_labels(n)
            .x_label_formatter(&x_formatter)
            .x_label_style(label_style)
            .y_label_formatter(&y_formatter)
            .x_desc(spec.x_desc)
            .y_desc("Revenue")
            .draw()
            .map_err(|e| draw_err(&e))?;

        match spec.kind {
            ChartKind::Line => {
                let points = series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (SegmentValue::CenterOf(i), *v));
                chart
                    .draw_series(LineSeries::new(points, LINE_COLOR.stroke_width(2)).point_size(4))
                    .map_err(|e| draw_err(&e))?;
            }
            ChartKind::Bar => {
                chart
                    .draw_series(
                        Histogram::vertical(&chart)
                            .style(BAR_COLOR.filled())
                            .margin(12)
                            .data(series.values.iter().enumerate().map(|(i, v)| (i, *v))),
                    )
                    .map_err(|e| draw_err(&e))?;
            }
        }

        root.present().map_err(|e| draw_err(&e))?;
        Ok(())
    }

    /// Value range with headroom; always includes zero.
    fn get_y_range(series: &CategorySeries) -> (f64, f64) {
        let (min, max) = series
            .values
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if max == min {
            return (0.0, 1.0);
        }
        let step = Self::nice_step(max - min, 8);
        let lo = if min < 0.0 { (min / step).floor() * step } else { 0.0 };
        let hi = ((max / step).ceil() * step).max(step);
        (lo, hi + step * 0.5)
    }

    fn nice_step(range: f64, target_steps: usize) -> f64 {
        let raw_step = range / target_steps as f64;
        let magnitude = 10f64.powf(raw_step.log10().floor());
        let normalized = raw_step / magnitude;

        let nice = if normalized <= 1.0 {
            1.0
        } else if normalized <= 2.0 {
            2.0
        } else if normalized <= 5.0 {
            5.0
        } else {
            10.0
        };

        nice * magnitude
    }
}

/// Cut long category names so rotated axis labels stay inside the label area.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let cut: String = label.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> CategorySeries {
        CategorySeries {
            labels: (0..values.len()).map(|i| format!("c{i}")).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn y_range_has_headroom_above_max() {
        let (lo, hi) = StaticChartRenderer::get_y_range(&series(&[100.0, 50.0]));
        assert_eq!(lo, 0.0);
        assert!(hi > 100.0);
    }

    #[test]
    fn y_range_extends_below_zero_for_negative_values() {
        let (lo, hi) = StaticChartRenderer::get_y_range(&series(&[-30.0, 80.0]));
        assert!(lo <= -30.0);
        assert!(hi >= 80.0);
    }

    #[test]
    fn y_range_of_empty_series_is_unit() {
        assert_eq!(StaticChartRenderer::get_y_range(&series(&[])), (0.0, 1.0));
    }

    #[test]
    fn nice_steps() {
        assert_eq!(StaticChartRenderer::nice_step(100.0, 10), 10.0);
        assert_eq!(StaticChartRenderer::nice_step(150.0, 10), 20.0);
        assert!((StaticChartRenderer::nice_step(0.3, 10) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn truncates_long_labels() {
        assert_eq!(truncate_label("Binder", 28), "Binder");
        let long = "Canon imageCLASS 2200 Advanced Copier";
        let cut = truncate_label(long, 12);
        assert_eq!(cut.chars().count(), 12);
        assert!(cut.ends_with('…'));
        assert!(cut.starts_with("Canon image"));
    }

    #[test]
    fn chart_paths_follow_stems() {
        let dir = Path::new("out");
        assert_eq!(MONTHLY_CHART.png_path(dir), dir.join("monthly.png"));
        assert_eq!(PRODUCTS_CHART.html_path(dir), dir.join("products.html"));
        let titles: Vec<&str> = CHARTS.iter().map(|c| c.title).collect();
        assert_eq!(titles, ["Monthly Revenue", "Revenue by Region", "Top Products"]);
    }
}
