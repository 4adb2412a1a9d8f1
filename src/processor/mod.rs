//! Processing engine.
//!
//! Walks the units selected from the configuration (one per mixed-array
//! datalogger, one per table of a table-based datalogger) and runs each
//! through its reader, header assignment, conversion, time parsing,
//! projection and export. Units are processed one after another; a unit's
//! cursor only moves once everything it exported has been written.

pub mod mixed_array;
pub mod table_based;

#[cfg(test)]
pub mod tests;

use crate::config::{AppConfig, MemoryStructure, Scope, UnitId, UnitOptions};
use crate::constants::{DEFAULT_FILE_EXTENSION, MISMATCHES_SUFFIX};
use crate::convert::convert_data_column_values;
use crate::error::{FormatterError, Result};
use crate::export::{ExportOptions, export_mismatches, export_parameters, export_to_csv, write_parquet_snapshot};
use crate::models::{Dataset, RunStats};
use crate::time::TimeParser;
use crate::upload::Publisher;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A file produced by a unit, with the remote directory it is published to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub local: PathBuf,
    pub remote_dir: PathBuf,
}

/// Result of processing one unit
#[derive(Debug, Clone, Default)]
pub struct UnitReport {
    pub stats: RunStats,
    pub next_cursor: usize,
    /// Files handed to the publisher, if any
    pub outputs: Vec<Output>,
}

/// Where a unit's files go
#[derive(Debug, Clone)]
pub(crate) struct UnitTarget<'a> {
    pub unit: &'a UnitId,
    pub output_dir: &'a Path,
    pub parquet_dir: Option<&'a Path>,
    pub extension: &'a str,
}

impl UnitTarget<'_> {
    fn local_dir(&self) -> PathBuf {
        self.output_dir.join(self.unit.relative_dir())
    }
}

/// Runs configured units and keeps their cursors
pub struct Processor {
    config: AppConfig,
    output_dir: PathBuf,
    parquet_dir: Option<PathBuf>,
    publisher: Option<Box<dyn Publisher>>,
    track: Option<PathBuf>,
    show_progress: bool,
}

impl Processor {
    pub fn new(config: AppConfig) -> Self {
        let output_dir = config.output_dir();
        let parquet_dir = config.settings.parquet_output_dir.clone();
        Self {
            config,
            output_dir,
            parquet_dir,
            publisher: None,
            track: None,
            show_progress: false,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Also write Parquet snapshots under `dir`
    pub fn with_parquet_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.parquet_dir = dir;
        }
        self
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Persist advanced cursors to `config_path` after every unit
    pub fn with_tracking(mut self, config_path: Option<PathBuf>) -> Self {
        self.track = config_path;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// Process every unit in `scope`
    ///
    /// Configuration problems confined to one unit are logged and counted
    /// while the remaining units carry on. I/O failures abort the run; the
    /// failing unit keeps its cursor.
    pub fn run(&mut self, scope: &Scope) -> Result<RunStats> {
        let mut stats = RunStats::default();

        let units = self.config.select_units(scope)?;
        if !self.config.settings.active {
            warn!("System is inactive; skipping {} units", units.len());
            stats.units_skipped = units.len();
            return Ok(stats);
        }

        info!("Processing {} units into {}", units.len(), self.output_dir.display());

        for unit in &units {
            let spinner = self.spinner(&format!("Processing {}", unit));
            let result = self.process_unit(unit);
            spinner.finish_and_clear();

            let report = match result {
                Ok(report) => report,
                Err(err) if err.is_unit_scoped() => {
                    error!("Unit {} failed: {}", unit, err);
                    stats.units_failed += 1;
                    continue;
                }
                Err(err) => {
                    error!("Aborting run at unit {}: {}", unit, err);
                    return Err(err);
                }
            };

            stats.merge(&report.stats);
            self.config.set_cursor(unit, report.next_cursor)?;
            if let Some(path) = &self.track {
                self.config.save(path)?;
                info!("Updated {} up to line number {}", unit, report.next_cursor);
            }

            if let Err(err) = self.publish(&report.outputs) {
                error!("Publishing output of {} failed: {}", unit, err);
                stats.units_failed += 1;
            } else if self.publisher.is_some() {
                stats.files_published += report.outputs.len();
            }
        }

        if let Some(publisher) = self.publisher.as_mut() {
            publisher.finish()?;
        }

        Ok(stats)
    }

    /// Process a single unit from its current cursor
    pub fn process_unit(&self, unit: &UnitId) -> Result<UnitReport> {
        let logger = self.config.datalogger(&unit.site, &unit.location, &unit.datalogger)?;
        let cursor = self.config.cursor(unit)?;
        info!("Processing {} from line {}", unit, cursor);

        let mut report = match (logger.memory_structure, &unit.table) {
            (MemoryStructure::MixedArray, _) => {
                mixed_array::process(self, unit, logger, cursor)?
            }
            (MemoryStructure::TableBased, Some(table)) => {
                table_based::process(self, unit, logger, table, cursor)?
            }
            (MemoryStructure::TableBased, None) => {
                return Err(FormatterError::configuration(format!(
                    "{}: table based datalogger processed without a table",
                    unit
                )));
            }
        };

        report.stats.units_processed = 1;
        report.next_cursor = report.next_cursor.max(cursor);
        info!(
            "Done processing {}: {} rows read, {} exported, {} quarantined",
            unit.to_string().bright_white(),
            report.stats.rows_read,
            report.stats.rows_exported,
            report.stats.rows_quarantined
        );
        Ok(report)
    }

    pub(crate) fn target<'a>(&'a self, unit: &'a UnitId, extension: &'a str) -> UnitTarget<'a> {
        UnitTarget {
            unit,
            output_dir: &self.output_dir,
            parquet_dir: self.parquet_dir.as_deref(),
            extension,
        }
    }

    fn publish(&mut self, outputs: &[Output]) -> Result<()> {
        let Some(publisher) = self.publisher.as_mut() else {
            return Ok(());
        };
        for output in outputs {
            publisher.publish(&output.local, &output.remote_dir)?;
        }
        Ok(())
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Source extension with its dot, e.g. `.dat`
pub(crate) fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_FILE_EXTENSION.to_string())
}

/// Write quarantined rows next to the main output as `<name> Mismatches<ext>`
pub(crate) fn export_unit_mismatches(
    target: &UnitTarget<'_>,
    name: &str,
    mismatches: &Dataset,
    report: &mut UnitReport,
) -> Result<()> {
    if mismatches.is_empty() {
        return Ok(());
    }
    let path = target
        .local_dir()
        .join(format!("{}{}{}", name, MISMATCHES_SUFFIX, target.extension));
    let written = export_mismatches(mismatches, &path)?;
    warn!("Quarantined {} rows of '{}' in {}", written, name, path.display());

    report.stats.rows_quarantined += written;
    report.stats.files_written += 1;
    Ok(())
}

/// Convert, parse time, project and write one named dataset
///
/// `lines` is the source line range the rows came from, used to name the
/// Parquet part file.
pub(crate) fn export_unit_dataset(
    target: &UnitTarget<'_>,
    options: &UnitOptions,
    parser: &TimeParser,
    out_name: &str,
    data: Dataset,
    lines: (usize, usize),
    report: &mut UnitReport,
) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let mut data = data;
    if !options.convert_data_column_values.is_empty() {
        data = convert_data_column_values(data, &options.convert_data_column_values, parser)?;
    }
    if let Some(time_columns) = &options.time_columns {
        data = parser.parse_dataset(data, time_columns, options.time_parsed_column());
    }

    let projected = match &options.export_columns {
        Some(columns) => data.project(columns),
        None => data.clone(),
    };

    let local_dir = target.local_dir();
    let remote_dir = target.unit.relative_dir();
    let path = local_dir.join(format!("{}{}", out_name, target.extension));
    let time_zone = options.include_time_zone.then(|| parser.time_zone());
    let exported = export_to_csv(&projected, &path, ExportOptions::with_header().time_zone(time_zone))?;
    debug!("Exported {} rows of '{}' to {}", exported, out_name, path.display());

    report.stats.rows_exported += exported;
    report.stats.files_written += 1;
    report.outputs.push(Output {
        local: path,
        remote_dir: remote_dir.clone(),
    });

    if let Some(parameters) = &options.parameters {
        let written = export_parameters(
            &data,
            parameters,
            options.time_parsed_column(),
            &local_dir.join(out_name),
            target.extension,
        )?;
        report.stats.files_written += written.len();
        report.outputs.extend(written.into_iter().map(|local| Output {
            local,
            remote_dir: remote_dir.join(out_name),
        }));
    }

    if let Some(parquet_dir) = target.parquet_dir {
        let dir = parquet_dir.join(&remote_dir).join(out_name);
        if write_parquet_snapshot(&projected, &dir, lines.0, lines.1)?.is_some() {
            report.stats.files_written += 1;
        }
    }

    Ok(())
}
