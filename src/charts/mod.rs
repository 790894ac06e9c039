//! Charts module - static PNG rendering and interactive HTML pages

pub mod dashboard;
pub mod renderer;

pub use dashboard::{DashboardBuilder, DashboardError, DashboardPaths};
pub use renderer::{ChartError, ChartKind, ChartSpec, StaticChartRenderer, CHARTS};
