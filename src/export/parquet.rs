//! Columnar snapshot of an exported table.
//!
//! Each run that exports rows also writes them as one Parquet part file.
//! Column types are inferred from the values: timestamps become UTC
//! millisecond datetimes, all-numeric columns Float64, the rest strings.

use super::format_value;
use crate::error::Result;
use crate::models::{Dataset, Value};
use polars::prelude::{
    Column, DataFrame, DataType, NamedFrom, ParquetCompression, ParquetWriter, Series, TimeUnit,
    TimeZone,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inferred storage type of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Timestamp,
    Float,
    Text,
}

fn infer_kind<'a>(values: impl Iterator<Item = Option<&'a Value>> + Clone) -> ColumnKind {
    let present = values.flatten();
    if present.clone().all(|v| v.as_timestamp().is_some()) {
        ColumnKind::Timestamp
    } else if present.clone().all(|v| v.as_f64().is_some()) {
        ColumnKind::Float
    } else {
        ColumnKind::Text
    }
}

/// Convert a dataset to a DataFrame, one column per key of the first row
pub fn dataset_to_frame(data: &Dataset) -> Result<DataFrame> {
    let mut columns = Vec::new();

    for key in data.columns() {
        let name = key.to_string();
        let values = data.iter().map(|row| row.get(&key));

        let series = match infer_kind(values.clone()) {
            ColumnKind::Timestamp => {
                let millis: Vec<Option<i64>> = values
                    .map(|v| v.and_then(Value::as_timestamp).map(|ts| ts.timestamp_millis()))
                    .collect();
                Series::new(name.as_str().into(), millis)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC)))?
            }
            ColumnKind::Float => {
                let floats: Vec<Option<f64>> = values.map(|v| v.and_then(Value::as_f64)).collect();
                Series::new(name.as_str().into(), floats)
            }
            ColumnKind::Text => {
                let text: Vec<Option<String>> = values.map(|v| v.map(|v| format_value(v, None))).collect();
                Series::new(name.as_str().into(), text)
            }
        };
        columns.push(Column::from(series));
    }

    Ok(DataFrame::new(columns)?)
}

/// Write `data` as `part-<first>-<last>.parquet` under `dir`
///
/// `first` and `last` are the source line range the rows came from.
pub fn write_parquet_snapshot(data: &Dataset, dir: &Path, first: usize, last: usize) -> Result<Option<PathBuf>> {
    if data.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("part-{:08}-{:08}.parquet", first, last));

    let mut frame = dataset_to_frame(data)?;
    let file = File::create(&path)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut frame)?;

    debug!("Wrote {} rows to {}", frame.height(), path.display());
    Ok(Some(path))
}
