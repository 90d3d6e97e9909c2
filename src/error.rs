//! Error handling for pump processing operations.
//!
//! Provides the typed failures surfaced by the pipeline (configuration and
//! dataset-level problems) and the row-level [`MalformedRowError`] that the
//! cleaner recovers from locally.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Empty dataset: {context}")]
    EmptyDataset { context: String },

    #[error("Export failed for {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

impl PumpError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an empty dataset error
    pub fn empty_dataset(context: impl Into<String>) -> Self {
        Self::EmptyDataset {
            context: context.into(),
        }
    }

    /// True for failures caused by configuration rather than data
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// True for failures caused by an empty dataset or scope
    pub fn is_empty_dataset(&self) -> bool {
        matches!(self, Self::EmptyDataset { .. })
    }
}

/// Required field of a raw row that failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawField {
    Timestamp,
    Voltage,
    Current,
    Power,
}

impl RawField {
    pub fn name(&self) -> &'static str {
        match self {
            RawField::Timestamp => "timestamp",
            RawField::Voltage => "voltage",
            RawField::Current => "current",
            RawField::Power => "power",
        }
    }
}

impl std::fmt::Display for RawField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row that could not be turned into a reading.
///
/// Never aborts a run: the cleaner drops the row, counts it and keeps a
/// bounded sample of these for diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: invalid {field} value '{value}' ({reason})")]
pub struct MalformedRowError {
    pub line: usize,
    pub field: RawField,
    pub value: String,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, PumpError>;
