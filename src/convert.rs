//! Derived column recomputation.
//!
//! A conversion rewrites one column from a different set of raw columns,
//! e.g. a secondary timestamp assembled from its own year/day/time fields.
//! Only the target column changes; every other column and the row order are
//! left as they were.

use crate::config::{ConvertColumnSpec, OrderedMap};
use crate::error::{FormatterError, Result};
use crate::models::{ColumnKey, Dataset, Value};
use crate::time::TimeParser;
use std::str::FromStr;
use tracing::debug;

/// Kinds of value a column can be recomputed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Time,
}

impl FromStr for ValueType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(ValueType::Time),
            _ => Err(()),
        }
    }
}

/// Resolve the value type of every conversion, in configuration order
///
/// Fails on the first unsupported value type.
pub fn conversion_plan(
    conversions: &OrderedMap<ConvertColumnSpec>,
) -> Result<Vec<(&str, ValueType, &ConvertColumnSpec)>> {
    conversions
        .iter()
        .map(|(column, spec)| {
            let value_type = spec.value_type.parse::<ValueType>().map_err(|_| {
                FormatterError::UnsupportedValueConversion {
                    column: column.to_string(),
                    value_type: spec.value_type.clone(),
                }
            })?;
            Ok((column, value_type, spec))
        })
        .collect()
}

/// Apply every configured conversion, in configuration order
///
/// All value types are checked before any row is touched, so an unsupported
/// conversion fails without partially converting the data.
pub fn convert_data_column_values(
    data: Dataset,
    conversions: &OrderedMap<ConvertColumnSpec>,
    parser: &TimeParser,
) -> Result<Dataset> {
    let plan = conversion_plan(conversions)?;

    let mut data = data;
    for (column, value_type, spec) in plan {
        debug!(
            "Converting column '{}' as {:?} from {:?}",
            column, value_type, spec.value_time_columns
        );
        data = match value_type {
            ValueType::Time => convert_time_column(data, column, &spec.value_time_columns, parser),
        };
    }
    Ok(data)
}

/// Recompute `column` from `source_columns` and splice the values back
fn convert_time_column(
    data: Dataset,
    column: &str,
    source_columns: &[ColumnKey],
    parser: &TimeParser,
) -> Dataset {
    let values: Vec<Value> = data
        .iter()
        .map(|row| Value::Timestamp(parser.parse_columns(row, source_columns)))
        .collect();

    let key = ColumnKey::from(column);
    data.into_iter()
        .zip(values)
        .map(|(mut row, value)| {
            row.set(key.clone(), value);
            row
        })
        .collect()
}
