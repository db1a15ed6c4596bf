//! Typed errors for the extraction and roster engines

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Source file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Source exists but cannot be decoded (bad UTF-8, broken CSV/JSON)
    #[error("Malformed input in {source_name}: {reason}")]
    MalformedInput { source_name: String, reason: String },

    /// A mandatory field could not be located in a row or file
    #[error("Format error in {source_name}: {reason}")]
    Format { source_name: String, reason: String },

    /// A file's layout lacks a column every row needs
    #[error("Missing column in {source_name}: no '{column}' column")]
    MissingColumn { source_name: String, column: String },

    /// One family-roster fragment could not be decomposed
    #[error("Unparseable family member '{fragment}': {reason}")]
    Fragment { fragment: String, reason: String },

    /// Invalid configuration or roster metadata
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            source_name: path.display().to_string(),
            reason: reason.into(),
        }
    }

    pub fn format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Format {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn fragment(fragment: &str, reason: impl Into<String>) -> Self {
        Error::Fragment {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that only invalidate one record
    pub fn is_per_record(&self) -> bool {
        matches!(self, Error::Format { .. } | Error::Fragment { .. })
    }
}

/// Read a whole source file, mapping IO failures onto the source error kinds
pub fn read_source(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            Err(Error::malformed(path, "file is not valid UTF-8"))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Read a whole source file as raw bytes
pub fn read_source_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })
}

/// Open a source file for streaming reads
pub fn open_source(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })
}
