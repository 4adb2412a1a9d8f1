//! Error handling for datalogger file formatting.
//!
//! Only configuration and I/O problems are errors. Rows with unexpected
//! field counts and unparseable timestamps are data-shape issues and are
//! handled in-band (quarantine, epoch sentinel) instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Headers representation not found for table '{table}'")]
    NoHeaders { table: String },

    #[error("Unsupported value conversion type '{value_type}' for column '{column}': only time conversion is supported")]
    UnsupportedValueConversion { column: String, value_type: String },

    #[error("Invalid time format library: {reason}")]
    InvalidTimeFormat { reason: String },

    #[error("Unknown {kind} '{name}' in configuration")]
    UnknownScope { kind: &'static str, name: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Transfer of {path} failed: {reason}")]
    Transfer { path: PathBuf, reason: String },
}

impl FormatterError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_scope(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownScope {
            kind,
            name: name.into(),
        }
    }

    /// Errors confined to a single site/location/datalogger/table unit.
    ///
    /// A unit failing with one of these is skipped while the rest of the run
    /// carries on; everything else aborts the run.
    pub fn is_unit_scoped(&self) -> bool {
        matches!(
            self,
            Self::NoHeaders { .. }
                | Self::UnsupportedValueConversion { .. }
                | Self::InvalidTimeFormat { .. }
                | Self::Configuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FormatterError>;
