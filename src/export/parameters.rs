//! Per-parameter time series export.
//!
//! Each configured column becomes a `TIMESTAMP,VALUE` series in its own
//! file. A profile stacks several columns measured at different depths
//! into a single `TIMESTAMP,DEPTH,VALUE` file.

use super::csv::{ExportOptions, export_to_csv};
use crate::config::ParameterExport;
use crate::constants::{
    PARAMETER_DEPTH_COLUMN, PARAMETER_PRECISION, PARAMETER_TIME_COLUMN, PARAMETER_VALUE_COLUMN,
    PROFILE_PRECISION,
};
use crate::error::Result;
use crate::models::{ColumnKey, Dataset, Row, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Write the per-parameter files of one dataset under `dir`
///
/// Returns the paths written.
pub fn export_parameters(
    data: &Dataset,
    parameters: &ParameterExport,
    time_column: &str,
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    match parameters {
        ParameterExport::Parameter { columns } => {
            for column in columns {
                let series: Dataset = data
                    .iter()
                    .filter_map(|row| {
                        let ts = timestamp(row, time_column)?;
                        Some(point(ts, None, numeric(row.get_named(column))))
                    })
                    .collect();

                let path = dir.join(format!("{}{}", column, extension));
                let options = ExportOptions::with_header().precision(PARAMETER_PRECISION);
                if export_to_csv(&series, &path, options)? > 0 {
                    written.push(path);
                }
            }
        }
        ParameterExport::Profile {
            name,
            columns,
            depths,
        } => {
            let stacked: Dataset = data
                .iter()
                .filter_map(|row| timestamp(row, time_column).map(|ts| (ts, row)))
                .flat_map(|(ts, row)| {
                    columns
                        .iter()
                        .zip(depths)
                        .map(move |(column, depth)| point(ts.clone(), Some(*depth), numeric(row.get_named(column))))
                })
                .collect();

            let path = dir.join(format!("{}{}", name, extension));
            let options = ExportOptions::with_header().precision(PROFILE_PRECISION);
            if export_to_csv(&stacked, &path, options)? > 0 {
                written.push(path);
            }
        }
    }

    let skipped = data.iter().filter(|row| timestamp(row, time_column).is_none()).count();
    if skipped > 0 {
        warn!(
            "{} rows have no '{}' column and were left out of the parameter export",
            skipped, time_column
        );
    }

    Ok(written)
}

fn timestamp(row: &Row, time_column: &str) -> Option<Value> {
    row.get_named(time_column)
        .filter(|v| v.as_timestamp().is_some())
        .cloned()
}

fn numeric(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(f64::NAN)
}

fn point(ts: Value, depth: Option<f64>, value: f64) -> Row {
    let mut row = Row::new();
    row.set(ColumnKey::from(PARAMETER_TIME_COLUMN), ts);
    if let Some(depth) = depth {
        row.set(ColumnKey::from(PARAMETER_DEPTH_COLUMN), Value::Float(depth));
    }
    row.set(ColumnKey::from(PARAMETER_VALUE_COLUMN), Value::Float(value));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use std::fs;
    use tempfile::TempDir;

    fn data() -> Dataset {
        (0..2)
            .map(|i| {
                let ts = Tz::UTC.with_ymd_and_hms(2020, 2, 14, 8, 30 + i, 0).unwrap();
                vec![
                    (ColumnKey::from("Timestamp"), Value::Timestamp(ts)),
                    (ColumnKey::from("T1"), Value::text(format!("{}.5", i))),
                    (ColumnKey::from("T2"), Value::text(if i == 0 { "-0.25" } else { "bad" })),
                ]
                .into_iter()
                .collect::<Row>()
            })
            .collect()
    }

    #[test]
    fn test_parameter_files() {
        let dir = TempDir::new().unwrap();
        let parameters = ParameterExport::Parameter {
            columns: vec!["T1".into(), "T2".into()],
        };

        let written = export_parameters(&data(), &parameters, "Timestamp", dir.path(), ".dat").unwrap();
        assert_eq!(written.len(), 2);

        let t1 = fs::read_to_string(dir.path().join("T1.dat")).unwrap();
        assert_eq!(
            t1,
            "TIMESTAMP,VALUE\n2020-02-14 08:30:00+0000,0.500\n2020-02-14 08:31:00+0000,1.500\n"
        );
        let t2 = fs::read_to_string(dir.path().join("T2.dat")).unwrap();
        assert!(t2.ends_with("08:31:00+0000,NaN\n"));
    }

    #[test]
    fn test_profile_stacks_depths() {
        let dir = TempDir::new().unwrap();
        let parameters = ParameterExport::Profile {
            name: "WaterTemp".into(),
            columns: vec!["T1".into(), "T2".into()],
            depths: vec![0.5, 1.0],
        };

        export_parameters(&data(), &parameters, "Timestamp", dir.path(), ".csv").unwrap();
        let content = fs::read_to_string(dir.path().join("WaterTemp.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "TIMESTAMP,DEPTH,VALUE");
        assert_eq!(lines[1], "2020-02-14 08:30:00+0000,0.50,0.50");
        assert_eq!(lines[2], "2020-02-14 08:30:00+0000,1.00,-0.25");
        assert_eq!(lines[4], "2020-02-14 08:31:00+0000,1.00,NaN");
    }
}
