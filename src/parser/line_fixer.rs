//! Repairs fractional values written without a leading zero.
//!
//! The loggers emit `.5` and `-.5` where generic number parsers expect
//! `0.5` and `-0.5`. The fix runs on the raw line, before splitting, so
//! every later stage sees well-formed numbers.

use crate::constants::FIELD_SEPARATOR;
use std::borrow::Cow;

/// Replace `,.` with `,0.` and `,-.` with `,-0.`
///
/// Only fields after a separator are touched. Applying the fix twice gives
/// the same line as applying it once.
pub fn fix_floats(line: &str) -> Cow<'_, str> {
    if !line.contains(",.") && !line.contains(",-.") {
        return Cow::Borrowed(line);
    }
    Cow::Owned(line.replace(",.", ",0.").replace(",-.", ",-0."))
}

/// Fix a line and split it into fields
pub fn fix_line(line: &str) -> Vec<String> {
    fix_floats(line)
        .split(FIELD_SEPARATOR)
        .map(str::to_string)
        .collect()
}

/// Same repair for a single already-split field
pub fn fix_field(field: &str) -> Cow<'_, str> {
    if let Some(rest) = field.strip_prefix("-.") {
        Cow::Owned(format!("-0.{}", rest))
    } else if let Some(rest) = field.strip_prefix('.') {
        Cow::Owned(format!("0.{}", rest))
    } else {
        Cow::Borrowed(field)
    }
}
