//! Analyser configuration.
//! Paths and the remote dataset identifier, loaded from an optional TOML file
//! and overridden from the command line.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the Superstore sample inside the remote dataset.
pub const DEFAULT_FILE_NAME: &str = "Sample - Superstore.csv";
pub const DEFAULT_DATASET_ID: &str = "vivek468/superstore-dataset-final";
pub const DEFAULT_FETCHER: &str = "kaggle";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Everything a run needs to know about where data lives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyserConfig {
    /// Local CSV file. Acquisition is skipped when it already exists.
    pub dataset_path: PathBuf,
    /// Directory the fetcher downloads into.
    pub cache_dir: PathBuf,
    /// Directory receiving charts, reports and dashboard pages.
    pub output_dir: PathBuf,
    /// Remote dataset identifier handed to the fetcher.
    pub dataset_id: String,
    /// Fetcher executable (`kaggle` CLI by default).
    pub fetcher: String,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        let cache_dir = PathBuf::from("data");
        Self {
            dataset_path: cache_dir.join(DEFAULT_FILE_NAME),
            cache_dir,
            output_dir: PathBuf::from("output"),
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            fetcher: DEFAULT_FETCHER.to_string(),
        }
    }
}

impl AnalyserConfig {
    /// Load a TOML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// File name the fetcher is asked for, taken from `dataset_path`.
    pub fn file_name(&self) -> String {
        self.dataset_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_into_data_dir() {
        let config = AnalyserConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("data"));
        assert_eq!(
            config.dataset_path,
            PathBuf::from("data").join("Sample - Superstore.csv")
        );
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.file_name(), DEFAULT_FILE_NAME);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AnalyserConfig::from_toml("output_dir = \"reports\"\n").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.fetcher, "kaggle");
        assert_eq!(config.dataset_id, DEFAULT_DATASET_ID);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AnalyserConfig::from_toml("outptu_dir = \"x\"\n").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AnalyserConfig::load(Path::new("/nonexistent/analyser.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
