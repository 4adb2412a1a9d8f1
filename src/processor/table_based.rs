//! Table-based (CR1000) unit pipeline.

use super::{Processor, UnitReport, export_unit_dataset, export_unit_mismatches, file_extension};
use crate::config::{DataloggerConfig, UnitId};
use crate::error::{FormatterError, Result};
use crate::parser::{TableHeader, read_table_data};
use crate::time::{TimeFormatSpec, TimeParser};
use tracing::{debug, info};

pub(crate) fn process(
    processor: &Processor,
    unit: &UnitId,
    logger: &DataloggerConfig,
    table: &str,
    cursor: usize,
) -> Result<UnitReport> {
    let table_cfg = logger
        .tables
        .get(table)
        .ok_or_else(|| FormatterError::unknown_scope("table", table))?;
    let options = &table_cfg.options;
    let name = options.display_name(table);

    let library = table_cfg
        .time_format_args_library
        .as_deref()
        .or(logger.time_format_args_library.as_deref());
    let spec = TimeFormatSpec::resolve(logger.time_format(), library)?;
    let time_zone = table_cfg.time_zone.unwrap_or(logger.time_zone);
    debug!(
        "{}: file {}, header row {:?}, column names {:?}, export columns {:?}, time zone {}",
        unit,
        table_cfg.file_path.display(),
        table_cfg.header_row,
        table_cfg.column_names,
        options.export_columns,
        time_zone
    );

    let header = match (&table_cfg.column_names, table_cfg.header_row) {
        (Some(columns), _) => Some(TableHeader::Columns(columns)),
        (None, Some(row)) => Some(TableHeader::Row(row)),
        (None, None) => None,
    };
    let data = read_table_data(
        &table_cfg.file_path,
        table,
        header,
        table_cfg.data_row,
        cursor,
        table_cfg.fix_floats,
    )?;

    let mut report = UnitReport {
        next_cursor: data.next_cursor,
        ..Default::default()
    };
    report.stats.rows_read = data.rows_read;

    if data.is_empty() {
        info!("No work to be done for table: {}", name);
        return Ok(report);
    }
    info!("Found {} new rows", data.rows_read);

    let extension = file_extension(&table_cfg.file_path);
    let target = processor.target(unit, &extension);
    let parser = TimeParser::new(spec, time_zone, options.to_utc);
    let lines = (data.start_line, data.next_cursor);

    export_unit_dataset(&target, options, &parser, name, data.rows, lines, &mut report)?;
    export_unit_mismatches(&target, name, &data.mismatches, &mut report)?;

    Ok(report)
}
