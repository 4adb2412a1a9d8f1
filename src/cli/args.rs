//! Command-line argument definitions
//!
//! Defines the CLI surface with the clap derive API. Scope flags mirror the
//! configuration tree: a location needs a site, a datalogger a location and a
//! table a datalogger.

use crate::config::Scope;
use crate::constants::{DEFAULT_CLEAN_PATTERNS, DEFAULT_CONFIG_FILE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Formats Campbell Scientific datalogger files into clean time series
#[derive(Debug, Clone, Parser)]
#[command(
    name = "loggerfiles-formatter",
    version,
    about = "Format CR10X mixed-array and CR1000 table-based datalogger files",
    long_about = "Reads datalogger files from the line each unit stopped at last time, \
                  splits and labels their rows, parses timestamps and appends the result \
                  to per-unit CSV files. Optionally writes per-parameter series, Parquet \
                  snapshots, and uploads finished files over FTP."
)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        default_value = DEFAULT_CONFIG_FILE,
        global = true
    )]
    pub config: PathBuf,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Process new lines of the configured datalogger files
    Process(ProcessArgs),
    /// Delete exported files under the output directory
    Clean(CleanArgs),
    /// List the configured units and their cursors
    Show,
}

#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Only process this site
    #[arg(short = 's', long = "site", value_name = "SITE")]
    pub site: Option<String>,

    /// Only process this location
    #[arg(short = 'l', long = "location", value_name = "LOCATION", requires = "site")]
    pub location: Option<String>,

    /// Only process this datalogger
    #[arg(short = 'd', long = "datalogger", value_name = "DATALOGGER", requires = "location")]
    pub datalogger: Option<String>,

    /// Only process this table of a table-based datalogger
    #[arg(short = 'f', long = "table", value_name = "TABLE", requires = "datalogger")]
    pub table: Option<String>,

    /// Write advanced cursors back to the configuration file
    #[arg(short = 't', long = "track")]
    pub track: bool,

    /// Upload finished files to the configured FTP server
    #[arg(long = "upload", conflicts_with = "mirror")]
    pub upload: bool,

    /// Copy finished files into a local directory tree instead of uploading
    #[arg(long = "mirror", value_name = "DIR")]
    pub mirror: Option<PathBuf>,

    /// Also write Parquet snapshots under this directory
    #[arg(long = "parquet", value_name = "DIR")]
    pub parquet: Option<PathBuf>,
}

impl ProcessArgs {
    pub fn scope(&self) -> Scope {
        Scope {
            site: self.site.clone(),
            location: self.location.clone(),
            datalogger: self.datalogger.clone(),
            table: self.table.clone(),
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct CleanArgs {
    /// Glob pattern of file names to delete; repeatable
    #[arg(short = 'p', long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// List what would be deleted without deleting it
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl CleanArgs {
    pub fn patterns(&self) -> Vec<String> {
        if self.patterns.is_empty() {
            DEFAULT_CLEAN_PATTERNS.iter().map(|p| p.to_string()).collect()
        } else {
            self.patterns.clone()
        }
    }
}

impl Args {
    /// Log level from `-v` occurrences, or `error` when quiet
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
