//! Mixed-array splitter.
//!
//! Reads a mixed-array file from a line cursor, fixes each line's floats
//! and routes its fields into a bucket keyed by `(array id, field count)`.
//! The same array id may show up with several field counts over a file's
//! life (program changes add or remove columns), so every variant is kept
//! apart.

use super::line_fixer::fix_line;
use crate::error::{FormatterError, Result};
use crate::models::{ArrayIdBucket, Dataset, Row};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Buckets of one read, grouped by array id in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct ArrayIdData {
    arrays: Vec<(String, Vec<ArrayIdBucket>)>,
    /// Cursor the read started from
    pub start_line: usize,
    /// Lines consumed past the cursor, blank lines included
    pub rows_read: usize,
}

impl ArrayIdData {
    /// Buckets stored under an array id or its display name
    pub fn get(&self, name: &str) -> &[ArrayIdBucket] {
        self.arrays
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, buckets)| buckets.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ArrayIdBucket])> {
        self.arrays.iter().map(|(n, b)| (n.as_str(), b.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(|(n, _)| n.as_str())
    }

    /// Rows across all buckets
    pub fn total_rows(&self) -> usize {
        self.arrays
            .iter()
            .flat_map(|(_, buckets)| buckets.iter())
            .map(|b| b.rows.len())
            .sum()
    }

    /// Cursor for the next run
    pub fn next_cursor(&self) -> usize {
        self.start_line + self.rows_read
    }

    /// Route one line past the cursor; blank lines only advance the cursor
    fn push_line(&mut self, line: &str, array_id_names: Option<&HashMap<String, String>>) {
        self.rows_read += 1;

        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let fields = fix_line(line);
        let array_id = fields[0].trim().to_string();
        let key = array_id_names
            .and_then(|names| names.get(&array_id))
            .map(String::as_str)
            .unwrap_or(&array_id);
        self.push(key, &array_id, fields);
    }

    fn push(&mut self, key: &str, array_id: &str, fields: Vec<String>) {
        let field_count = fields.len();
        let row = Row::from_raw(fields);

        let index = match self.arrays.iter().position(|(n, _)| n == key) {
            Some(index) => index,
            None => {
                self.arrays.push((key.to_string(), Vec::new()));
                self.arrays.len() - 1
            }
        };
        let buckets = &mut self.arrays[index].1;

        match buckets.iter_mut().find(|b| b.field_count == field_count) {
            Some(bucket) => bucket.rows.push(row),
            None => buckets.push(ArrayIdBucket {
                array_id: array_id.to_string(),
                field_count,
                rows: Dataset::from(vec![row]),
            }),
        }
    }
}

/// Read and split a mixed-array file starting at line `first_line_num`
///
/// When `array_id_names` is given, buckets are stored under the display
/// name of their array id; unknown ids keep the raw id.
pub fn read_array_ids_data(
    path: &Path,
    first_line_num: usize,
    array_id_names: Option<&HashMap<String, String>>,
) -> Result<ArrayIdData> {
    if !path.exists() {
        return Err(FormatterError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = BufReader::new(File::open(path)?);
    let mut data = ArrayIdData {
        start_line: first_line_num,
        ..Default::default()
    };
    for chunk in reader.split(b'\n').skip(first_line_num) {
        let chunk = chunk?;
        data.push_line(&String::from_utf8_lossy(&chunk), array_id_names);
    }

    debug!(
        "Read {} new lines from {} ({} arrays, starting at line {})",
        data.rows_read,
        path.display(),
        data.arrays.len(),
        first_line_num
    );
    Ok(data)
}

/// Split already-read lines; lines before `first_line_num` are skipped
pub fn split_lines<I, S>(
    lines: I,
    first_line_num: usize,
    array_id_names: Option<&HashMap<String, String>>,
) -> ArrayIdData
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut data = ArrayIdData {
        start_line: first_line_num,
        ..Default::default()
    };

    for line in lines.into_iter().skip(first_line_num) {
        data.push_line(line.as_ref(), array_id_names);
    }

    data
}
