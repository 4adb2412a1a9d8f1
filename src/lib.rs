//! Loggerfiles Formatter Library
//!
//! Formats Campbell Scientific datalogger files into clean, resumable time
//! series exports.
//!
//! This library provides tools for:
//! - Splitting CR10X mixed-array files by array id and labelling the rows
//! - Reading CR1000 table-based files with a header line or configured columns
//! - Quarantining rows whose shape matches no configured header
//! - Parsing legacy (year, day of year, hour-minute) and modern timestamps
//! - Appending CSV exports, per-parameter series and Parquet snapshots
//! - Publishing finished files over FTP
//!
//! Every configured unit keeps a line cursor in the YAML configuration, so a
//! run only reads what the logger wrote since the previous one.

pub mod config;
pub mod constants;
pub mod convert;
pub mod error;
pub mod export;
pub mod models;
pub mod parser;
pub mod processor;
pub mod time;
pub mod upload;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{AppConfig, Scope, UnitId};
pub use error::{FormatterError, Result};
pub use models::{ColumnKey, Dataset, Row, RunStats, Value};
pub use processor::Processor;
