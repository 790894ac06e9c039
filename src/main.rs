//! Sales Analyser - Sales Performance Report Generator
//!
//! Command line entry point: resolves configuration, runs the pipeline and
//! prints progress and KPIs.

use anyhow::{Context, Result};
use clap::Parser;
use sales_analyser::data::KaggleCli;
use sales_analyser::logging::init_logging;
use sales_analyser::stats::format_thousands;
use sales_analyser::{pipeline, AnalyserConfig, Stage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sales_analyser", version, about = "Sales performance analyser")]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local sales CSV
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory the dataset is downloaded into
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Directory for charts, reports and dashboard pages
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Remote dataset identifier
    #[arg(long)]
    dataset_id: Option<String>,

    /// Never invoke the fetcher
    #[arg(long)]
    skip_download: bool,

    /// Open the dashboard index in the default browser when done
    #[arg(long)]
    open: bool,

    /// Also print the KPIs as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<AnalyserConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyserConfig::load(path)?,
            None => AnalyserConfig::default(),
        };

        if let Some(cache_dir) = &self.cache_dir {
            // Keep the CSV inside the cache dir unless --data says otherwise
            config.dataset_path = cache_dir.join(config.file_name());
            config.cache_dir = cache_dir.clone();
        }
        if let Some(data) = &self.data {
            config.dataset_path = data.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(dataset_id) = &self.dataset_id {
            config.dataset_id = dataset_id.clone();
        }
        Ok(config)
    }
}

fn print_stage(stage: Stage) {
    println!("[{}/{}] {}...", stage.number(), Stage::ALL.len(), stage.description());
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let fetcher = KaggleCli::new(config.fetcher.clone());

    println!("{}", "=".repeat(60));
    println!("SALES PERFORMANCE ANALYSER");
    println!("{}", "=".repeat(60));

    let summary = pipeline::run(&config, &fetcher, cli.skip_download, &mut print_stage)
        .with_context(|| format!("sales analysis of {} aborted", config.dataset_path.display()))?;

    println!();
    println!("KEY PERFORMANCE INDICATORS");
    println!("{}", "-".repeat(60));
    for (name, value) in summary.analysis.kpis.entries() {
        println!("{}: {}", name, format_thousands(value));
    }
    println!("{}", "-".repeat(60));
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary.analysis.kpis)?);
    }

    let outputs = &summary.outputs;
    println!("Charts:    {}", outputs.charts.len());
    println!("Report:    {}", outputs.report.display());
    println!("Workbook:  {}", outputs.workbook.display());
    println!("Dashboard: {}", outputs.dashboard.index.display());
    println!("Done. All outputs in {}", config.output_dir.display());

    if cli.open {
        open::that(&outputs.dashboard.index)
            .with_context(|| format!("cannot open {}", outputs.dashboard.index.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "sales_analyser",
            "--cache-dir",
            "cache",
            "--output-dir",
            "out",
            "--dataset-id",
            "someone/sales",
            "--skip-download",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.dataset_path, PathBuf::from("cache").join("Sample - Superstore.csv"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.dataset_id, "someone/sales");
        assert!(cli.skip_download);
        assert!(!cli.open);
        assert!(!cli.json);
    }

    #[test]
    fn data_flag_wins_over_cache_dir() {
        let cli = Cli::parse_from(["sales_analyser", "--cache-dir", "cache", "--data", "my.csv"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("my.csv"));
    }
}
