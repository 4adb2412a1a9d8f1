//! Header assignment and mismatch quarantine.
//!
//! A bucket of rows sharing a field count is named with the first header
//! variant of the same length. Buckets no variant fits are passed through
//! untouched as mismatches, so every input row ends up in exactly one of
//! the two outputs.

use crate::config::HeaderSpec;
use crate::models::{ArrayIdBucket, ColumnKey, Dataset, Row};
use tracing::debug;

/// Outcome of naming a single bucket
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderMatch<'a> {
    Matched { variant: &'a str, rows: Dataset },
    Mismatched(Dataset),
}

/// Named datasets per header variant plus quarantined raw rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayAssignment {
    pub matched: Vec<(String, Dataset)>,
    pub mismatches: Dataset,
}

impl ArrayAssignment {
    pub fn matched_rows(&self) -> usize {
        self.matched.iter().map(|(_, rows)| rows.len()).sum()
    }

    fn add_matched(&mut self, variant: &str, rows: Dataset) {
        match self.matched.iter_mut().find(|(v, _)| v == variant) {
            Some((_, existing)) => existing.extend(rows),
            None => self.matched.push((variant.to_string(), rows)),
        }
    }
}

/// Rename a positional row with `header`; lengths must already agree
pub fn apply_header(row: Row, header: &[String]) -> Row {
    header
        .iter()
        .zip(row.into_values())
        .map(|(name, value)| (ColumnKey::Name(name.clone()), value))
        .collect()
}

/// Name one bucket with the first variant matching its field count
pub fn assign_headers<'a>(bucket: ArrayIdBucket, spec: Option<&'a HeaderSpec>) -> HeaderMatch<'a> {
    let variant = spec.and_then(|spec| {
        spec.variants()
            .into_iter()
            .find(|(_, columns)| columns.len() == bucket.field_count)
    });

    match variant {
        Some((variant, header)) => HeaderMatch::Matched {
            variant,
            rows: bucket.rows.into_iter().map(|row| apply_header(row, header)).collect(),
        },
        None => {
            debug!(
                "No header of length {} for array id {}; quarantining {} rows",
                bucket.field_count,
                bucket.array_id,
                bucket.rows.len()
            );
            HeaderMatch::Mismatched(bucket.rows)
        }
    }
}

/// Name every bucket of one array id
pub fn assign_array_headers(buckets: &[ArrayIdBucket], spec: Option<&HeaderSpec>) -> ArrayAssignment {
    let mut assignment = ArrayAssignment::default();

    for bucket in buckets {
        match assign_headers(bucket.clone(), spec) {
            HeaderMatch::Matched { variant, rows } => assignment.add_matched(variant, rows),
            HeaderMatch::Mismatched(rows) => assignment.mismatches.extend(rows),
        }
    }

    assignment
}
