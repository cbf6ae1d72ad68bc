//! Error type shared by every stage of the spectrum pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading tables, merging or plotting.
#[derive(Error, Debug)]
pub enum SpectrumError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot read k-mer table {}: {reason}", path.display())]
    TableUnreadable { path: PathBuf, reason: String },

    #[error("K-mer table {table} is corrupt at record {record}: {message}")]
    TableCorrupt {
        table: String,
        record: u64,
        message: String,
    },

    #[error("K-mer length of table {table} is {found}, expected {expected}")]
    KmerLengthMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid scale: {0}")]
    InvalidScale(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Plotting failed: {0}")]
    Render(String),
}

impl SpectrumError {
    /// Wrap an open/header failure for the table at `path`.
    pub fn unreadable<P: Into<PathBuf>>(path: P, reason: impl ToString) -> Self {
        Self::TableUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Ordering violation at `record` (0-based) of `table`.
    pub fn corrupt(table: &str, record: u64, message: impl Into<String>) -> Self {
        Self::TableCorrupt {
            table: table.to_string(),
            record,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
