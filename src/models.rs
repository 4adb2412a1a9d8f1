//! Core data structures for datalogger processing.
//!
//! A [`Row`] is an ordered list of `(column, value)` pairs. Columns are
//! positional until a header is assigned, after which they carry names.
//! Field order is export order.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column identifier: a position before header assignment, a name after
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Index(index) => write!(f, "{}", index),
            ColumnKey::Name(name) => f.write_str(name),
        }
    }
}

/// Scalar cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Float(f64),
    Timestamp(DateTime<Tz>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Tz>> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// Numeric view of the value, parsing text when needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Text(text) => text.trim().parse::<f64>().ok(),
            Value::Timestamp(_) => None,
        }
    }
}

/// One record of a dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(ColumnKey, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a positional row from raw fields
    pub fn from_raw<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .enumerate()
                .map(|(i, f)| (ColumnKey::Index(i), Value::Text(f.into())))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of `key`; an index no column is keyed by falls back to the
    /// physical position, so index keys still resolve after headers are set
    pub fn position(&self, key: &ColumnKey) -> Option<usize> {
        self.fields.iter().position(|(k, _)| k == key).or(match key {
            ColumnKey::Index(i) if *i < self.fields.len() => Some(*i),
            _ => None,
        })
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&Value> {
        self.position(key).map(|pos| &self.fields[pos].1)
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| matches!(k, ColumnKey::Name(n) if n == name))
            .map(|(_, v)| v)
    }

    /// Value at a physical position, regardless of key
    pub fn get_at(&self, position: usize) -> Option<&Value> {
        self.fields.get(position).map(|(_, v)| v)
    }

    /// Replace the value under `key`, or append it when absent
    pub fn set(&mut self, key: ColumnKey, value: Value) {
        match self.position(&key) {
            Some(pos) => self.fields[pos].1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Insert before `position`; an existing `key` is replaced where it stands
    pub fn insert_at(&mut self, position: usize, key: ColumnKey, value: Value) {
        match self.position(&key) {
            Some(pos) => self.fields[pos].1 = value,
            None => {
                let position = position.min(self.fields.len());
                self.fields.insert(position, (key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &ColumnKey) -> Option<Value> {
        let pos = self.position(key)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.fields.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnKey, &Value)> {
        self.fields.iter().map(|(k, v)| (k, v))
    }

    pub fn into_values(self) -> impl Iterator<Item = Value> {
        self.fields.into_iter().map(|(_, v)| v)
    }

    /// Keep only the named columns, preserving the row's own order
    pub fn project(&self, columns: &[String]) -> Row {
        Row {
            fields: self
                .fields
                .iter()
                .filter(|(k, _)| match k {
                    ColumnKey::Name(name) => columns.iter().any(|c| c == name),
                    ColumnKey::Index(i) => columns.iter().any(|c| c == &i.to_string()),
                })
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<(ColumnKey, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (ColumnKey, Value)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

/// Ordered sequence of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Column keys of the first row
    pub fn columns(&self) -> Vec<ColumnKey> {
        self.rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn project(&self, columns: &[String]) -> Dataset {
        self.rows.iter().map(|row| row.project(columns)).collect()
    }

    pub fn extend(&mut self, other: Dataset) {
        self.rows.extend(other.rows);
    }
}

impl From<Vec<Row>> for Dataset {
    fn from(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl FromIterator<Row> for Dataset {
    fn from_iter<T: IntoIterator<Item = Row>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Dataset {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Rows of one array id sharing a field count, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIdBucket {
    pub array_id: String,
    pub field_count: usize,
    pub rows: Dataset,
}

/// Counters for one processing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub units_processed: usize,
    pub units_failed: usize,
    pub units_skipped: usize,
    pub rows_read: usize,
    pub rows_exported: usize,
    pub rows_quarantined: usize,
    pub files_written: usize,
    pub files_published: usize,
}

impl RunStats {
    pub fn merge(&mut self, other: &RunStats) {
        self.units_processed += other.units_processed;
        self.units_failed += other.units_failed;
        self.units_skipped += other.units_skipped;
        self.rows_read += other.rows_read;
        self.rows_exported += other.rows_exported;
        self.rows_quarantined += other.rows_quarantined;
        self.files_written += other.files_written;
        self.files_published += other.files_published;
    }

    pub fn is_success(&self) -> bool {
        self.units_failed == 0
    }
}
