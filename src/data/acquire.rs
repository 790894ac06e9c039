//! Dataset acquisition.
//! Ensures a local copy of the sales CSV exists, invoking an external fetcher
//! once when it does not.

use crate::config::AnalyserConfig;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("Failed to create cache dir {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to extract {archive}: {source}")]
    Extract {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What acquisition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The file was already present; nothing was fetched.
    Cached,
    /// The fetcher ran and the file is now present.
    Downloaded,
    /// The fetcher failed or left no file behind. Loading will fail later.
    FetchFailed(String),
}

/// Downloads one file of a remote dataset into a directory.
pub trait DatasetFetcher {
    fn fetch(&self, dataset_id: &str, file_name: &str, dest_dir: &Path) -> Result<(), String>;
}

/// The `kaggle` command line client (or anything accepting the same arguments).
pub struct KaggleCli {
    program: String,
}

impl KaggleCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, dataset_id: &str, file_name: &str, dest_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["datasets", "download", "-d", dataset_id, "-f", file_name, "-p"])
            .arg(dest_dir)
            .arg("--unzip");
        cmd
    }
}

impl DatasetFetcher for KaggleCli {
    fn fetch(&self, dataset_id: &str, file_name: &str, dest_dir: &Path) -> Result<(), String> {
        let status = self
            .command(dataset_id, file_name, dest_dir)
            .status()
            .map_err(|e| format!("could not run {}: {}", self.program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", self.program, status))
        }
    }
}

/// Make sure `config.dataset_path` exists, fetching it at most once.
///
/// The fetcher always downloads into `cache_dir`. When `dataset_path` lives
/// elsewhere the downloaded copy is placed there, so later runs find it.
pub fn ensure_dataset(
    config: &AnalyserConfig,
    fetcher: &dyn DatasetFetcher,
) -> Result<AcquireOutcome, AcquireError> {
    let target = &config.dataset_path;
    if target.exists() {
        info!("dataset already present at {}", target.display());
        return Ok(AcquireOutcome::Cached);
    }

    let file_name = config.file_name();
    let downloaded = config.cache_dir.join(&file_name);
    if downloaded.exists() {
        info!("dataset found in cache at {}", downloaded.display());
        place_dataset(&downloaded, target)?;
        return Ok(AcquireOutcome::Cached);
    }

    fs::create_dir_all(&config.cache_dir).map_err(|source| AcquireError::CacheDir {
        path: config.cache_dir.clone(),
        source,
    })?;

    info!(
        "downloading {} from {} into {}",
        file_name,
        config.dataset_id,
        config.cache_dir.display()
    );
    if let Err(reason) = fetcher.fetch(&config.dataset_id, &file_name, &config.cache_dir) {
        warn!("dataset fetch failed: {}", reason);
        return Ok(AcquireOutcome::FetchFailed(reason));
    }

    if !downloaded.exists() {
        let archive = config.cache_dir.join(format!("{}.zip", file_name));
        if archive.exists() {
            extract_entry(&archive, &file_name, &downloaded)?;
        }
    }

    if downloaded.exists() {
        place_dataset(&downloaded, target)?;
        Ok(AcquireOutcome::Downloaded)
    } else {
        let reason = format!("fetcher left no {} in {}", file_name, config.cache_dir.display());
        warn!("{}", reason);
        Ok(AcquireOutcome::FetchFailed(reason))
    }
}

/// Copy the cached download to `target` unless they are the same file.
fn place_dataset(downloaded: &Path, target: &Path) -> Result<(), AcquireError> {
    if downloaded == target {
        return Ok(());
    }
    let write_err = |source| AcquireError::Write {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::copy(downloaded, target).map_err(write_err)?;
    info!("dataset copied to {}", target.display());
    Ok(())
}

/// Copy the archive entry whose base name is `file_name` to `target`.
fn extract_entry(archive_path: &Path, file_name: &str, target: &Path) -> Result<(), AcquireError> {
    let extract_err = |source| AcquireError::Extract {
        archive: archive_path.to_path_buf(),
        source,
    };
    let file = File::open(archive_path).map_err(|e| extract_err(e.into()))?;
    let mut archive = ZipArchive::new(file).map_err(extract_err)?;

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).map_err(extract_err)?;
        let name = entry.name().to_string();
        let base = name.rsplit('/').next().unwrap_or(&name);
        if base != file_name {
            continue;
        }

        let write_err = |source| AcquireError::Write {
            path: target.to_path_buf(),
            source,
        };
        let mut out = File::create(target).map_err(write_err)?;
        io::copy(&mut entry, &mut out).map_err(write_err)?;
        info!("extracted {} from {}", name, archive_path.display());
        return Ok(());
    }

    warn!("{} not found in {}", file_name, archive_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    struct CountingFetcher {
        calls: Cell<usize>,
        contents: Option<&'static str>,
    }

    impl DatasetFetcher for CountingFetcher {
        fn fetch(&self, _dataset_id: &str, file_name: &str, dest_dir: &Path) -> Result<(), String> {
            self.calls.set(self.calls.get() + 1);
            match self.contents {
                Some(text) => fs::write(dest_dir.join(file_name), text).map_err(|e| e.to_string()),
                None => Err("offline".to_string()),
            }
        }
    }

    fn config_in(dir: &Path) -> AnalyserConfig {
        let cache_dir = dir.join("data");
        AnalyserConfig {
            dataset_path: cache_dir.join("sales.csv"),
            cache_dir,
            output_dir: dir.join("output"),
            ..AnalyserConfig::default()
        }
    }

    #[test]
    fn fetches_once_then_uses_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            contents: Some("a,b\n1,2\n"),
        };

        assert_eq!(ensure_dataset(&config, &fetcher).unwrap(), AcquireOutcome::Downloaded);
        assert_eq!(ensure_dataset(&config, &fetcher).unwrap(), AcquireOutcome::Cached);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn fetch_failure_is_reported_not_raised() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            contents: None,
        };

        let outcome = ensure_dataset(&config, &fetcher).unwrap();
        assert_eq!(outcome, AcquireOutcome::FetchFailed("offline".to_string()));
        assert!(!config.dataset_path.exists());
    }

    #[test]
    fn dataset_outside_cache_dir_is_fetched_once() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AnalyserConfig {
            dataset_path: tmp.path().join("inputs").join("sales.csv"),
            ..config_in(tmp.path())
        };
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            contents: Some("a,b\n1,2\n"),
        };

        assert_eq!(ensure_dataset(&config, &fetcher).unwrap(), AcquireOutcome::Downloaded);
        assert_eq!(fs::read_to_string(&config.dataset_path).unwrap(), "a,b\n1,2\n");
        assert!(config.cache_dir.join("sales.csv").exists());
        assert_eq!(ensure_dataset(&config, &fetcher).unwrap(), AcquireOutcome::Cached);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn earlier_download_is_reused_for_a_new_dataset_path() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        fs::create_dir_all(&config.cache_dir).unwrap();
        fs::write(config.cache_dir.join("sales.csv"), "x\n").unwrap();
        let moved = AnalyserConfig {
            dataset_path: tmp.path().join("elsewhere").join("sales.csv"),
            ..config
        };
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            contents: None,
        };

        assert_eq!(ensure_dataset(&moved, &fetcher).unwrap(), AcquireOutcome::Cached);
        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(fs::read_to_string(&moved.dataset_path).unwrap(), "x\n");
    }

    #[test]
    fn kaggle_command_line() {
        let cmd = KaggleCli::new("kaggle").command("owner/set", "Sample - Superstore.csv", Path::new("data"));
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "kaggle");
        assert_eq!(
            args,
            [
                "datasets",
                "download",
                "-d",
                "owner/set",
                "-f",
                "Sample - Superstore.csv",
                "-p",
                "data",
                "--unzip"
            ]
        );
    }

    struct ZipLeavingFetcher;

    impl DatasetFetcher for ZipLeavingFetcher {
        fn fetch(&self, _dataset_id: &str, file_name: &str, dest_dir: &Path) -> Result<(), String> {
            let file = File::create(dest_dir.join(format!("{}.zip", file_name))).unwrap();
            let mut zip = ZipWriter::new(file);
            zip.start_file(file_name, FileOptions::default()).unwrap();
            zip.write_all(b"a,b\n1,2\n").unwrap();
            zip.finish().unwrap();
            Ok(())
        }
    }

    #[test]
    fn extracts_zipped_download() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let outcome = ensure_dataset(&config, &ZipLeavingFetcher).unwrap();
        assert_eq!(outcome, AcquireOutcome::Downloaded);
        assert_eq!(fs::read_to_string(&config.dataset_path).unwrap(), "a,b\n1,2\n");
    }
}
