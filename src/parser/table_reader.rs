//! Table-based (CR1000) file reader.
//!
//! Table files have one schema for the whole file. The header comes either
//! from the configuration or from a quoted header line inside the file.
//! Lines are parsed with the `csv` crate so quoted timestamps and strings
//! lose their quotes; rows of the wrong width are quarantined.

use super::headers::apply_header;
use super::line_fixer::fix_field;
use crate::error::{FormatterError, Result};
use crate::models::{Dataset, Row};
use csv::{ByteRecord, ReaderBuilder};
use std::path::Path;
use tracing::debug;

/// Where a table's column names come from
#[derive(Debug, Clone, Copy)]
pub enum TableHeader<'a> {
    /// Configured column names; data starts on line 0
    Columns(&'a [String]),
    /// Zero-based line holding the header; data starts on the next line
    Row(usize),
}

/// Rows of one read of a table file
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub header: Vec<String>,
    pub rows: Dataset,
    pub mismatches: Dataset,
    /// First line the read considered
    pub start_line: usize,
    /// Data rows consumed, mismatches included
    pub rows_read: usize,
    /// Line after the last data row consumed
    pub next_cursor: usize,
}

impl TableData {
    pub fn is_empty(&self) -> bool {
        self.rows_read == 0
    }
}

/// Read a table file from `first_line_num`
///
/// `data_row` overrides the first data line, for files with unit or
/// aggregation lines below the header.
pub fn read_table_data(
    path: &Path,
    table: &str,
    header: Option<TableHeader<'_>>,
    data_row: Option<usize>,
    first_line_num: usize,
    fix_floats: bool,
) -> Result<TableData> {
    let header = header.ok_or_else(|| FormatterError::NoHeaders {
        table: table.to_string(),
    })?;

    if !path.exists() {
        return Err(FormatterError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let (mut names, header_line, default_data_row) = match header {
        TableHeader::Columns(columns) => (Some(columns.to_vec()), None, 0),
        TableHeader::Row(row) => (None, Some(row), row + 1),
    };
    let start_line = first_line_num.max(data_row.unwrap_or(default_data_row));

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut data = TableData {
        start_line,
        next_cursor: first_line_num,
        ..Default::default()
    };
    let mut record = ByteRecord::new();

    while reader.read_byte_record(&mut record)? {
        let line = record
            .position()
            .map(|p| p.line().saturating_sub(1) as usize)
            .unwrap_or_default();

        if Some(line) == header_line {
            names = Some(decode(&record, false));
            continue;
        }
        if line < start_line {
            continue;
        }

        let Some(columns) = names.as_deref() else {
            return Err(FormatterError::NoHeaders {
                table: table.to_string(),
            });
        };

        let fields = decode(&record, fix_floats);
        let row = Row::from_raw(fields);
        if row.len() == columns.len() {
            data.rows.push(apply_header(row, columns));
        } else {
            data.mismatches.push(row);
        }
        data.rows_read += 1;
        data.next_cursor = line + 1;
    }

    data.header = names.unwrap_or_default();
    debug!(
        "Read {} rows ({} mismatched) from {} starting at line {}",
        data.rows_read,
        data.mismatches.len(),
        path.display(),
        start_line
    );
    Ok(data)
}

fn decode(record: &ByteRecord, fix_floats: bool) -> Vec<String> {
    record
        .iter()
        .map(|field| {
            let text = String::from_utf8_lossy(field);
            if fix_floats {
                fix_field(&text).into_owned()
            } else {
                text.into_owned()
            }
        })
        .collect()
}
