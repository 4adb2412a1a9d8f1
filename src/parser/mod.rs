//! Readers for Campbell Scientific datalogger files.
//!
//! Mixed-array files (CR10X) interleave many record schemas, told apart only
//! by the leading array id and the field count. They are split into
//! per-(array id, field count) buckets, then named against the configured
//! header variants. Table-based files (CR1000) carry a single header and go
//! straight to named rows. Both readers resume from a line cursor and never
//! drop a row: anything whose shape does not fit is returned as a mismatch.

pub mod headers;
pub mod line_fixer;
pub mod splitter;
pub mod table_reader;

pub use headers::{ArrayAssignment, HeaderMatch, apply_header, assign_array_headers, assign_headers};
pub use line_fixer::{fix_field, fix_floats, fix_line};
pub use splitter::{ArrayIdData, read_array_ids_data, split_lines};
pub use table_reader::{TableData, TableHeader, read_table_data};
