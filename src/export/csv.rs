//! Appending CSV exporter.

use super::format_value;
use crate::constants::TIME_ZONE_COLUMN;
use crate::error::Result;
use crate::models::Dataset;
use ::csv::WriterBuilder;
use chrono_tz::Tz;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::debug;

/// How a dataset is written
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Write the column names when the target file is new or empty
    pub header: bool,
    /// Decimal places for float values
    pub precision: Option<usize>,
    /// Append a column holding this time zone's name
    pub time_zone: Option<Tz>,
}

impl ExportOptions {
    pub fn with_header() -> Self {
        Self {
            header: true,
            ..Default::default()
        }
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn time_zone(mut self, time_zone: Option<Tz>) -> Self {
        self.time_zone = time_zone;
        self
    }
}

/// Append `data` to `path`, creating parent directories as needed
///
/// Returns the number of rows written. An empty dataset leaves the target
/// untouched.
pub fn export_to_csv(data: &Dataset, path: &Path, options: ExportOptions) -> Result<usize> {
    if data.is_empty() {
        return Ok(0);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let needs_header = options.header && fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    if needs_header {
        let mut header: Vec<String> = data.columns().iter().map(ToString::to_string).collect();
        if options.time_zone.is_some() {
            header.push(TIME_ZONE_COLUMN.to_string());
        }
        writer.write_record(&header)?;
    }

    for row in data {
        let mut record: Vec<String> = row.values().map(|v| format_value(v, options.precision)).collect();
        if let Some(tz) = options.time_zone {
            record.push(tz.name().to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    debug!("Appended {} rows to {}", data.len(), path.display());
    Ok(data.len())
}

/// Append quarantined raw rows, without a header
pub fn export_mismatches(mismatches: &Dataset, path: &Path) -> Result<usize> {
    export_to_csv(mismatches, path, ExportOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnKey, Row, Value};
    use chrono::TimeZone;
    use chrono_tz::Europe::Stockholm;
    use tempfile::TempDir;

    fn sample() -> Dataset {
        let ts = Stockholm.with_ymd_and_hms(2020, 2, 14, 8, 30, 0).unwrap();
        let row: Row = vec![
            (ColumnKey::from("Timestamp"), Value::Timestamp(ts)),
            (ColumnKey::from("Temp"), Value::Float(1.23456)),
            (ColumnKey::from("Note"), Value::text("a,b")),
        ]
        .into_iter()
        .collect();
        Dataset::from(vec![row])
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site/location/logger/out.dat");
        let options = ExportOptions::with_header().precision(3);

        assert_eq!(export_to_csv(&sample(), &path, options).unwrap(), 1);
        assert_eq!(export_to_csv(&sample(), &path, options).unwrap(), 1);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,Temp,Note");
        assert_eq!(lines[1], "2020-02-14 08:30:00+0100,1.235,\"a,b\"");
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.dat");
        fs::write(&path, "").unwrap();

        export_to_csv(&sample(), &path, ExportOptions::with_header()).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("Timestamp,Temp,Note\n"));
    }

    #[test]
    fn test_time_zone_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.dat");
        let options = ExportOptions::with_header().precision(2).time_zone(Some(Stockholm));

        export_to_csv(&sample(), &path, options).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Timestamp,Temp,Note,TimeZone");
        assert!(lines[1].ends_with(",1.23,\"a,b\",Europe/Stockholm"));
    }

    #[test]
    fn test_mismatches_have_no_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out Mismatches.dat");
        let rows = Dataset::from(vec![Row::from_raw(["201", "1", "0.5"])]);

        export_mismatches(&rows, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "201,1,0.5\n");
    }

    #[test]
    fn test_empty_dataset_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nothing.dat");
        assert_eq!(export_to_csv(&Dataset::new(), &path, ExportOptions::with_header()).unwrap(), 0);
        assert!(!path.exists());
    }
}
