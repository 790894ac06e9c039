//! Pipeline Module
//! Runs the stages in order: acquire, load, KPIs, aggregate, then the
//! charts, PDF report, workbook and dashboard.

use crate::charts::{ChartError, DashboardBuilder, DashboardError, DashboardPaths, StaticChartRenderer};
use crate::config::AnalyserConfig;
use crate::data::{
    ensure_dataset, AcquireError, AcquireOutcome, AggregateError, Aggregates, Aggregator, DataLoader,
    DatasetFetcher, LoaderError, SalesTable,
};
use crate::pdf::{PdfAssembler, PdfError};
use crate::stats::{KpiCalculator, KpiError, Kpis};
use crate::xlsx::{XlsxError, XlsxGenerator};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Load,
    Kpis,
    Aggregate,
    Charts,
    Pdf,
    Spreadsheet,
    Dashboard,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Acquire,
        Stage::Load,
        Stage::Kpis,
        Stage::Aggregate,
        Stage::Charts,
        Stage::Pdf,
        Stage::Spreadsheet,
        Stage::Dashboard,
    ];

    /// Progress line shown before the stage runs.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Acquire => "Checking dataset",
            Stage::Load => "Loading and cleaning data",
            Stage::Kpis => "Computing KPIs",
            Stage::Aggregate => "Aggregating revenue",
            Stage::Charts => "Rendering static charts",
            Stage::Pdf => "Assembling PDF report",
            Stage::Spreadsheet => "Exporting workbook",
            Stage::Dashboard => "Building interactive dashboard",
        }
    }

    /// 1-based position in [`Stage::ALL`].
    pub fn number(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).map_or(0, |i| i + 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquire => "acquire",
            Stage::Load => "load",
            Stage::Kpis => "kpi",
            Stage::Aggregate => "aggregate",
            Stage::Charts => "charts",
            Stage::Pdf => "pdf",
            Stage::Spreadsheet => "spreadsheet",
            Stage::Dashboard => "dashboard",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("acquire failed: {0}")]
    Acquire(#[from] AcquireError),
    #[error("load failed: {0}")]
    Load(#[from] LoaderError),
    #[error("kpi failed: {0}")]
    Kpis(#[from] KpiError),
    #[error("aggregate failed: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("charts failed: {0}")]
    Charts(#[from] ChartError),
    #[error("charts failed: cannot create output dir {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pdf failed: {0}")]
    Pdf(#[from] PdfError),
    #[error("spreadsheet failed: {0}")]
    Spreadsheet(#[from] XlsxError),
    #[error("dashboard failed: {0}")]
    Dashboard(#[from] DashboardError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Acquire(_) => Stage::Acquire,
            PipelineError::Load(_) => Stage::Load,
            PipelineError::Kpis(_) => Stage::Kpis,
            PipelineError::Aggregate(_) => Stage::Aggregate,
            PipelineError::Charts(_) | PipelineError::OutputDir { .. } => Stage::Charts,
            PipelineError::Pdf(_) => Stage::Pdf,
            PipelineError::Spreadsheet(_) => Stage::Spreadsheet,
            PipelineError::Dashboard(_) => Stage::Dashboard,
        }
    }
}

/// In-memory results of the analysis stages.
#[derive(Debug)]
pub struct Analysis {
    /// `None` when acquisition was skipped.
    pub acquired: Option<AcquireOutcome>,
    pub table: SalesTable,
    pub kpis: Kpis,
    pub aggregates: Aggregates,
}

/// Files written by the output stages.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub charts: Vec<PathBuf>,
    pub report: PathBuf,
    pub workbook: PathBuf,
    pub dashboard: DashboardPaths,
}

#[derive(Debug)]
pub struct RunSummary {
    pub analysis: Analysis,
    pub outputs: OutputPaths,
}

/// Acquire, load, compute KPIs and aggregate. Writes nothing to the output dir.
pub fn analyse(
    config: &AnalyserConfig,
    fetcher: &dyn DatasetFetcher,
    skip_download: bool,
    on_stage: &mut dyn FnMut(Stage),
) -> Result<Analysis, PipelineError> {
    on_stage(Stage::Acquire);
    let acquired = if skip_download {
        info!("acquisition skipped");
        None
    } else {
        Some(ensure_dataset(config, fetcher)?)
    };

    on_stage(Stage::Load);
    let table = DataLoader::load_sales(&config.dataset_path)?;
    info!("loaded {} records", table.height());

    on_stage(Stage::Kpis);
    let kpis = KpiCalculator::compute(&table)?;

    on_stage(Stage::Aggregate);
    let aggregates = Aggregator::aggregate(&table)?;

    Ok(Analysis {
        acquired,
        table,
        kpis,
        aggregates,
    })
}

/// Render every output into `output_dir`, creating it if needed.
pub fn publish(
    analysis: &Analysis,
    output_dir: &Path,
    on_stage: &mut dyn FnMut(Stage),
) -> Result<OutputPaths, PipelineError> {
    on_stage(Stage::Charts);
    fs::create_dir_all(output_dir).map_err(|source| PipelineError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let charts = StaticChartRenderer::render_all(&analysis.aggregates, output_dir)?;

    on_stage(Stage::Pdf);
    let report = PdfAssembler::assemble_pdf(output_dir)?;

    on_stage(Stage::Spreadsheet);
    let workbook = XlsxGenerator::export_workbook(&analysis.aggregates, &analysis.kpis, output_dir)?;

    on_stage(Stage::Dashboard);
    let dashboard = DashboardBuilder::build(&analysis.aggregates, &analysis.kpis, output_dir)?;

    Ok(OutputPaths {
        charts,
        report,
        workbook,
        dashboard,
    })
}

/// Full run. The first failing stage aborts; files already written stay.
pub fn run(
    config: &AnalyserConfig,
    fetcher: &dyn DatasetFetcher,
    skip_download: bool,
    on_stage: &mut dyn FnMut(Stage),
) -> Result<RunSummary, PipelineError> {
    let analysis = analyse(config, fetcher, skip_download, on_stage)?;
    let outputs = publish(&analysis, &config.output_dir, on_stage)?;
    info!("all outputs written to {}", config.output_dir.display());
    Ok(RunSummary { analysis, outputs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_numbered_in_order() {
        let numbers: Vec<usize> = Stage::ALL.iter().map(Stage::number).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
        assert_eq!(Stage::Pdf.to_string(), "pdf");
    }

    #[test]
    fn errors_report_their_stage() {
        let err = PipelineError::from(KpiError::EmptyDataset);
        assert_eq!(err.stage(), Stage::Kpis);
        assert_eq!(
            err.to_string(),
            "kpi failed: Cannot compute KPIs: dataset has no records"
        );

        let err = PipelineError::from(LoaderError::MissingColumn("profit".into()));
        assert_eq!(err.stage(), Stage::Load);
    }
}
