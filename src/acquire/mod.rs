//! Dataset acquisition: authenticate, download, pick a tabular file, parse it.
//!
//! Every failure is logged here and handed back as an [`AcquireError`]; the
//! caller only decides whether to continue.

pub mod kaggle;

use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use thiserror::Error;

use crate::data::loader;
use crate::data::model::Table;

pub use kaggle::KaggleApi;

// ---------------------------------------------------------------------------
// Dataset reference
// ---------------------------------------------------------------------------

/// `owner/name` identifier of a remotely hosted dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    owner: String,
    name: String,
}

impl DatasetRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons acquisition produced no table.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no Kaggle credentials found: set KAGGLE_USERNAME and KAGGLE_KEY or provide kaggle.json")]
    MissingCredentials,

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("download requested before authentication")]
    NotAuthenticated,

    #[error("dataset not found: {dataset}")]
    DatasetNotFound { dataset: String },

    #[error("download of {dataset} failed: {message}")]
    Transfer { dataset: String, message: String },

    #[error("could not unpack archive: {message}")]
    Archive { message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no CSV files found in {}", dir.display())]
    NoTabularFile { dir: PathBuf },

    #[error("could not parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Remote host seam
// ---------------------------------------------------------------------------

/// A remote repository that can hand over a dataset as local files.
pub trait DatasetHost {
    /// Establish credentials. Must succeed before any download.
    fn authenticate(&mut self) -> Result<(), AcquireError>;

    /// Fetch `dataset` and unpack its files directly into `target`.
    fn download_and_unpack(&self, dataset: &DatasetRef, target: &Path) -> Result<(), AcquireError>;
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

/// A parsed dataset and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub table: Table,
    pub source: PathBuf,
}

/// Download `dataset` into `download_dir` and load its tabular file.
///
/// Each call authenticates and downloads again; nothing is retried.
pub fn load_dataset<H: DatasetHost>(
    host: &mut H,
    dataset: &DatasetRef,
    download_dir: &Path,
) -> Result<LoadedDataset, AcquireError> {
    let result = try_load_dataset(host, dataset, download_dir);
    if let Err(e) = &result {
        error!("{e}");
    }
    result
}

fn try_load_dataset<H: DatasetHost>(
    host: &mut H,
    dataset: &DatasetRef,
    download_dir: &Path,
) -> Result<LoadedDataset, AcquireError> {
    std::fs::create_dir_all(download_dir).map_err(|source| AcquireError::Io {
        path: download_dir.to_path_buf(),
        source,
    })?;

    host.authenticate()?;

    info!(
        "Downloading dataset: {dataset} to '{}'",
        download_dir.display()
    );
    host.download_and_unpack(dataset, download_dir)?;

    let source = select_tabular_file(download_dir)?;
    info!("Loading file: {}", source.display());

    let table = loader::load_file(&source).map_err(|e| AcquireError::Parse {
        path: source.clone(),
        message: format!("{e:#}"),
    })?;
    info!(
        "Dataset loaded successfully ({} rows, {} columns)",
        table.len(),
        table.columns().len()
    );

    Ok(LoadedDataset { table, source })
}

/// Pick the tabular file to load from `dir`.
///
/// Candidates are ordered by file name so the choice does not depend on the
/// platform's directory listing order.
pub fn select_tabular_file(dir: &Path) -> Result<PathBuf, AcquireError> {
    let mut candidates = loader::find_tabular_files(dir).map_err(|source| AcquireError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let Some(chosen) = candidates.first().cloned() else {
        return Err(AcquireError::NoTabularFile {
            dir: dir.to_path_buf(),
        });
    };

    if candidates.len() > 1 {
        let names: Vec<String> = candidates.iter().map(|p| file_name(p)).collect();
        warn!("{}", multiple_candidates_message(&names, &file_name(&chosen)));
    }

    Ok(chosen)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Warning naming every candidate file and the one that will be loaded.
fn multiple_candidates_message(names: &[String], chosen: &str) -> String {
    format!(
        "Multiple CSV files found: [{}]; loading '{chosen}' by default",
        names.join(", ")
    )
}
