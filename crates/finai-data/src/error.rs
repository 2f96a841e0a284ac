//! Error types for data loading

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, DataLoadError>;

/// Errors raised while reading a source document
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// The file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading the file failed
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the file
    #[error("Invalid CSV in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The workbook could not be opened or a sheet could not be read
    #[error("Unreadable workbook '{}': {detail}", path.display())]
    Workbook { path: PathBuf, detail: String },

    /// The file was read but its content has an unexpected shape
    #[error("Malformed data in '{}': {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },
}

impl DataLoadError {
    /// Classify an I/O failure, separating a missing file from other errors
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn malformed(path: &Path, detail: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    /// Whether the error only says the file is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
