//! Application constants for the datalogger formatter
//!
//! Default names, file suffixes and output formats shared across the
//! parsing, export and CLI layers.

// =============================================================================
// Parsing
// =============================================================================

/// Field separator used by both datalogger formats
pub const FIELD_SEPARATOR: char = ',';

/// Name of the implicit header variant when `column_names` is a flat list
pub const DEFAULT_HEADER_VARIANT: &str = "default";

/// Default time format library for mixed-array (CR10X) files
pub const LEGACY_TIME_FORMAT_LIBRARY: &[&str] = &["%Y", "%j", "%H%M"];

/// Timestamp pattern written by table-based (CR1000) loggers
pub const MODERN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Export
// =============================================================================

/// Default name of the parsed timestamp column
pub const DEFAULT_TIME_PARSED_COLUMN: &str = "Timestamp";

/// Suffix appended to an array name for quarantined rows
pub const MISMATCHES_SUFFIX: &str = " Mismatches";

/// Extension used when the source file has none
pub const DEFAULT_FILE_EXTENSION: &str = ".dat";

/// Timestamp format for exported files, e.g. `2020-02-14 08:30:00+0100`
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Decimal places for scalar parameter values
pub const PARAMETER_PRECISION: usize = 3;

/// Decimal places for stacked profile values
pub const PROFILE_PRECISION: usize = 2;

/// Column name of the appended time zone column
pub const TIME_ZONE_COLUMN: &str = "TimeZone";

/// Per-parameter export column names
pub const PARAMETER_TIME_COLUMN: &str = "TIMESTAMP";
pub const PARAMETER_DEPTH_COLUMN: &str = "DEPTH";
pub const PARAMETER_VALUE_COLUMN: &str = "VALUE";

/// Representation of a missing numeric value in per-parameter exports
pub const MISSING_VALUE: &str = "NaN";

// =============================================================================
// CLI
// =============================================================================

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "loggerfilesformatter.yaml";

/// File patterns removed by `clean` when none are given
pub const DEFAULT_CLEAN_PATTERNS: &[&str] = &["*.dat", "*.csv", "*.parquet"];

/// Crate target used for the default log filter
pub const LOG_TARGET: &str = "loggerfiles_formatter";
