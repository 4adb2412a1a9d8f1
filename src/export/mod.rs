//! Output writers for processed datasets.
//!
//! Every writer appends to what a previous run produced and never rewrites
//! existing content:
//!
//! - [`csv`]: the main per-table files and their mismatch siblings
//! - [`parameters`]: one time series per parameter, or stacked profiles
//! - [`parquet`]: a columnar snapshot of each run's export

pub mod csv;
pub mod parameters;
pub mod parquet;

pub use self::csv::{ExportOptions, export_mismatches, export_to_csv};
pub use self::parameters::export_parameters;
pub use self::parquet::write_parquet_snapshot;

use crate::constants::{EXPORT_TIMESTAMP_FORMAT, MISSING_VALUE};
use crate::models::Value;

/// Text form of a value; floats use `precision` decimals when given
pub fn format_value(value: &Value, precision: Option<usize>) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Float(v) if v.is_nan() => MISSING_VALUE.to_string(),
        Value::Float(v) => match precision {
            Some(precision) => format!("{:.*}", precision, v),
            None => v.to_string(),
        },
        Value::Timestamp(ts) => ts.format(EXPORT_TIMESTAMP_FORMAT).to_string(),
    }
}
