//! Interactive Dashboard Module
//! Writes each summary table as a standalone HTML page. Data is embedded as
//! JSON and drawn into an inline SVG by an inline script, with hover tooltips.
//! No external scripts or stylesheets are referenced.

use crate::charts::renderer::{chart_series, ChartKind, ChartSpec, CHARTS};
use crate::data::{Aggregates, CategorySeries};
use crate::stats::{format_thousands, Kpis};
use crate::xlsx::escape_xml;
use polars::prelude::PolarsError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const INDEX_FILE: &str = "index.html";

/// Series colors, cycled by chart position.
pub const PALETTE: [&str; 3] = ["#5b9bd5", "#4472c4", "#ed7d31"];

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode chart data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Paths written by [`DashboardBuilder::build`].
#[derive(Debug, Clone)]
pub struct DashboardPaths {
    pub charts: Vec<PathBuf>,
    pub index: PathBuf,
}

/// Payload read by the inline chart script.
#[derive(Serialize)]
struct ChartPayload<'a> {
    title: &'a str,
    kind: &'a str,
    x_label: &'a str,
    y_label: &'a str,
    rotate: bool,
    color: &'a str,
    labels: &'a [String],
    values: &'a [f64],
}

pub struct DashboardBuilder;

impl DashboardBuilder {
    /// Write `monthly.html`, `region.html`, `products.html` and `index.html`.
    pub fn build(
        aggregates: &Aggregates,
        kpis: &Kpis,
        output_dir: &Path,
    ) -> Result<DashboardPaths, DashboardError> {
        let mut charts = Vec::with_capacity(CHARTS.len());
        for (idx, (spec, series)) in chart_series(aggregates)?.iter().enumerate() {
            let html = Self::chart_page(spec, series, PALETTE[idx % PALETTE.len()])?;
            let path = spec.html_path(output_dir);
            write_file(&path, &html)?;
            info!("dashboard page saved: {}", path.display());
            charts.push(path);
        }

        let index = output_dir.join(INDEX_FILE);
        write_file(&index, &Self::index_page(kpis))?;
        info!("dashboard index saved: {}", index.display());

        Ok(DashboardPaths { charts, index })
    }

    /// A complete HTML document for one chart.
    pub fn chart_page(spec: &ChartSpec, series: &CategorySeries, color: &str) -> Result<String, DashboardError> {
        let payload = ChartPayload {
            title: spec.title,
            kind: match spec.kind {
                ChartKind::Line => "line",
                ChartKind::Bar => "bar",
            },
            x_label: spec.x_desc,
            y_label: "Revenue",
            rotate: spec.rotate_labels,
            color,
            labels: &series.labels,
            values: &series.values,
        };
        // "</" would close the script element early
        let json = serde_json::to_string(&payload)?.replace("</", "<\\/");

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<h1>{title}</h1>
<div id="chart"></div>
<div id="tooltip"></div>
<script>const CHART = {json};</script>
<script>{script}</script>
</body>
</html>
"#,
            title = escape_xml(spec.title),
            style = CHART_CSS,
            json = json,
            script = CHART_JS,
        ))
    }

    /// KPI cards followed by the three chart pages embedded in frames.
    pub fn index_page(kpis: &Kpis) -> String {
        let cards: String = kpis
            .entries()
            .iter()
            .map(|(name, value)| {
                format!(
                    "<div class=\"card\"><div class=\"name\">{}</div><div class=\"value\">{}</div></div>\n",
                    escape_xml(name),
                    format_thousands(*value)
                )
            })
            .collect();
        let frames: String = CHARTS
            .iter()
            .map(|spec| {
                format!(
                    "<iframe src=\"{}.html\" title=\"{}\"></iframe>\n",
                    spec.stem,
                    escape_xml(spec.title)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sales Performance Dashboard</title>
<style>{style}</style>
</head>
<body>
<h1>Sales Performance Dashboard</h1>
<section class="cards">
{cards}</section>
<section class="frames">
{frames}</section>
</body>
</html>
"#,
            style = INDEX_CSS,
            cards = cards,
            frames = frames,
        )
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), DashboardError> {
    fs::write(path, contents).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })
}

const CHART_CSS: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 24px; color: #222; }
h1 { font-size: 22px; font-weight: 600; }
#chart { max-width: 1100px; }
.grid { stroke: #e3e3e3; }
.axis { stroke: #444; }
.tick { font-size: 12px; fill: #444; }
.axis-title { font-size: 13px; fill: #222; }
.line { fill: none; stroke-width: 2.5; }
.point, .bar { cursor: pointer; }
.point:hover, .bar:hover { opacity: 0.75; }
#tooltip { position: absolute; display: none; white-space: pre; pointer-events: none;
  background: rgba(30, 30, 30, 0.9); color: #fff; padding: 6px 9px; border-radius: 4px; font-size: 12px; }
"#;

const INDEX_CSS: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 24px; color: #222; background: #f6f7f9; }
.cards { display: flex; flex-wrap: wrap; gap: 12px; margin-bottom: 20px; }
.card { background: #fff; border-radius: 6px; padding: 12px 16px; min-width: 160px; box-shadow: 0 1px 3px rgba(0, 0, 0, 0.12); }
.card .name { font-size: 12px; color: #666; text-transform: uppercase; letter-spacing: 0.04em; }
.card .value { font-size: 22px; font-weight: 600; margin-top: 4px; }
.frames iframe { width: 100%; height: 640px; border: none; background: #fff; margin-bottom: 16px; border-radius: 6px; }
"#;

const CHART_JS: &str = r#"
(function () {
  var NS = "http://www.w3.org/2000/svg";
  var data = CHART;
  var root = document.getElementById("chart");
  var tip = document.getElementById("tooltip");
  var W = 1000, H = 540;
  var M = { top: 20, right: 24, bottom: data.rotate ? 180 : 60, left: 96 };
  var w = W - M.left - M.right, h = H - M.top - M.bottom;

  var svg = document.createElementNS(NS, "svg");
  svg.setAttribute("viewBox", "0 0 " + W + " " + H);
  svg.setAttribute("width", "100%");
  root.appendChild(svg);

  function el(name, attrs) {
    var e = document.createElementNS(NS, name);
    for (var k in attrs) { e.setAttribute(k, attrs[k]); }
    svg.appendChild(e);
    return e;
  }

  var n = data.labels.length;
  var max = Math.max.apply(null, [0].concat(data.values));
  var min = Math.min.apply(null, [0].concat(data.values));
  var span = (max - min) || 1;
  max += span * 0.05;
  span = max - min;
  var band = w / Math.max(n, 1);
  function x(i) { return M.left + band * (i + 0.5); }
  function y(v) { return M.top + h - ((v - min) / span) * h; }
  function money(v) {
    return v.toLocaleString(undefined, { minimumFractionDigits: 2, maximumFractionDigits: 2 });
  }

  for (var t = 0; t <= 5; t++) {
    var v = min + (span * t) / 5, yy = y(v);
    el("line", { x1: M.left, x2: M.left + w, y1: yy, y2: yy, "class": "grid" });
    el("text", { x: M.left - 8, y: yy + 4, "text-anchor": "end", "class": "tick" })
      .textContent = Math.round(v).toLocaleString();
  }
  el("line", { x1: M.left, x2: M.left + w, y1: y(0), y2: y(0), "class": "axis" });
  el("line", { x1: M.left, x2: M.left, y1: M.top, y2: M.top + h, "class": "axis" });

  data.labels.forEach(function (label, i) {
    var text = label.length > 40 ? label.slice(0, 39) + "…" : label;
    var node = data.rotate
      ? el("text", { "class": "tick", transform: "translate(" + x(i) + "," + (M.top + h + 12) + ") rotate(45)" })
      : el("text", { "class": "tick", x: x(i), y: M.top + h + 20, "text-anchor": "middle" });
    node.textContent = text;
  });
  el("text", { x: M.left + w / 2, y: H - 8, "text-anchor": "middle", "class": "axis-title" })
    .textContent = data.x_label;
  el("text", { "class": "axis-title", "text-anchor": "middle",
    transform: "translate(18," + (M.top + h / 2) + ") rotate(-90)" }).textContent = data.y_label;

  function show(evt, i) {
    tip.textContent = data.x_label + ": " + data.labels[i] + "\n" + data.y_label + ": " + money(data.values[i]);
    tip.style.display = "block";
    tip.style.left = evt.pageX + 14 + "px";
    tip.style.top = evt.pageY + 14 + "px";
  }
  function hide() { tip.style.display = "none"; }
  function hover(node, i) {
    node.addEventListener("mousemove", function (evt) { show(evt, i); });
    node.addEventListener("mouseleave", hide);
  }

  if (data.kind === "line") {
    var pts = data.values.map(function (v, i) { return x(i) + "," + y(v); }).join(" ");
    el("polyline", { points: pts, "class": "line", stroke: data.color });
    data.values.forEach(function (v, i) {
      hover(el("circle", { cx: x(i), cy: y(v), r: 5, fill: data.color, "class": "point" }), i);
    });
  } else {
    data.values.forEach(function (v, i) {
      var top = Math.min(y(v), y(0));
      hover(el("rect", { x: x(i) - band * 0.4, y: top, width: band * 0.8,
        height: Math.abs(y(v) - y(0)), fill: data.color, "class": "bar" }), i);
    });
  }
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::renderer::{MONTHLY_CHART, PRODUCTS_CHART};

    fn series(labels: &[&str], values: &[f64]) -> CategorySeries {
        CategorySeries {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn chart_page_embeds_data_and_title() {
        let html = DashboardBuilder::chart_page(
            &MONTHLY_CHART,
            &series(&["2023-01", "2023-02"], &[150.0, 75.5]),
            PALETTE[0],
        )
        .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Monthly Revenue</title>"));
        assert!(html.contains(r#""kind":"line""#));
        assert!(html.contains(r#""labels":["2023-01","2023-02"]"#));
        assert!(html.contains(r#""values":[150.0,75.5]"#));
        assert!(!html.contains("<script src"));
        assert!(!html.contains("<link"));
        assert!(!html.contains("https://"));
    }

    #[test]
    fn script_breaking_labels_are_neutralised() {
        let html = DashboardBuilder::chart_page(
            &PRODUCTS_CHART,
            &series(&["</script><b>x</b>"], &[1.0]),
            PALETTE[2],
        )
        .unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains(r#""kind":"bar""#));
    }

    #[test]
    fn index_lists_kpis_and_frames() {
        let kpis = Kpis {
            total_revenue: 2297200.8603,
            total_orders: 9994,
            total_units: 37873.0,
            average_order_value: 229.858,
            average_discount: 0.156,
            total_profit: 286397.0217,
        };
        let html = DashboardBuilder::index_page(&kpis);
        assert!(html.contains("2,297,200.86"));
        assert!(html.contains("9,994.00"));
        assert!(html.contains("Average Order Value"));
        for stem in ["monthly", "region", "products"] {
            assert!(html.contains(&format!("src=\"{stem}.html\"")));
        }
    }

    #[test]
    fn build_writes_all_pages() {
        use crate::data::{Aggregator, DataLoader};

        let csv = "Order Date,Region,Product Name,Sales,Quantity,Discount,Profit\n\
                   2023-01-15,East,Widget,100,2,0,20\n\
                   2023-01-20,West,Gadget,50,1,0,5\n";
        let table = DataLoader::parse_bytes(csv.as_bytes()).unwrap();
        let aggregates = Aggregator::aggregate(&table).unwrap();
        let kpis = crate::stats::KpiCalculator::compute(&table).unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let paths = DashboardBuilder::build(&aggregates, &kpis, tmp.path()).unwrap();
        assert_eq!(paths.charts.len(), 3);
        for path in paths.charts.iter().chain(std::iter::once(&paths.index)) {
            assert!(path.exists(), "missing {}", path.display());
        }
        let region = fs::read_to_string(tmp.path().join("region.html")).unwrap();
        assert!(region.contains("Revenue by Region"));
        assert!(region.contains(r#""labels":["East","West"]"#));
    }
}
