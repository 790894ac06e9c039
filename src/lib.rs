//! Sales Analyser - sales CSV to charts, PDF report, workbook and HTML dashboard
//!
//! A linear pipeline over the Superstore sample dataset.

pub mod charts;
pub mod config;
pub mod data;
pub mod logging;
pub mod pdf;
pub mod pipeline;
pub mod stats;
pub mod xlsx;

pub use config::AnalyserConfig;
pub use pipeline::{analyse, publish, run, PipelineError, RunSummary, Stage};
