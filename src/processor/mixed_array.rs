//! Mixed-array (CR10X) unit pipeline.

use super::{Processor, UnitReport, export_unit_dataset, export_unit_mismatches, file_extension};
use crate::config::{DataloggerConfig, UnitId};
use crate::constants::DEFAULT_HEADER_VARIANT;
use crate::convert::conversion_plan;
use crate::error::{FormatterError, Result};
use crate::parser::{assign_array_headers, read_array_ids_data};
use crate::time::TimeParser;
use std::collections::HashMap;
use tracing::{debug, info};

pub(crate) fn process(
    processor: &Processor,
    unit: &UnitId,
    logger: &DataloggerConfig,
    cursor: usize,
) -> Result<UnitReport> {
    let file_path = logger.file_path.as_deref().ok_or_else(|| {
        FormatterError::configuration(format!("{}: mixed array datalogger requires 'file_path'", unit))
    })?;
    let spec = logger.time_format_spec()?;
    debug!(
        "{}: file {}, time zone {}, time format {:?}",
        unit,
        file_path.display(),
        logger.time_zone,
        spec.format()
    );

    let names: HashMap<String, String> = logger
        .array_ids
        .iter()
        .filter_map(|(id, cfg)| cfg.options.name.clone().map(|name| (id.to_string(), name)))
        .collect();

    let data = read_array_ids_data(file_path, cursor, Some(&names))?;
    let mut report = UnitReport {
        next_cursor: data.next_cursor(),
        ..Default::default()
    };
    report.stats.rows_read = data.rows_read;

    if data.total_rows() == 0 {
        info!("No work to be done for {}", unit);
        return Ok(report);
    }
    info!("Found {} new rows in {}", data.total_rows(), file_path.display());

    // A bad conversion on any array id fails the unit before anything is written
    for (_, array_cfg) in logger.array_ids.iter() {
        conversion_plan(&array_cfg.options.convert_data_column_values)?;
    }

    let extension = file_extension(file_path);
    let target = processor.target(unit, &extension);
    let lines = (data.start_line, data.next_cursor());

    for (array_id, array_cfg) in logger.array_ids.iter() {
        let name = array_cfg.options.display_name(array_id);
        let buckets = data.get(name);
        if buckets.is_empty() {
            debug!("No new rows for array id {} ({})", array_id, name);
            continue;
        }

        let parser = TimeParser::new(spec.clone(), logger.time_zone, array_cfg.options.to_utc);
        let assignment = assign_array_headers(buckets, array_cfg.column_names.as_ref());

        for (variant, rows) in assignment.matched {
            let out_name = if variant == DEFAULT_HEADER_VARIANT {
                name.to_string()
            } else {
                format!("{} {}", name, variant)
            };
            export_unit_dataset(&target, &array_cfg.options, &parser, &out_name, rows, lines, &mut report)?;
        }
        export_unit_mismatches(&target, name, &assignment.mismatches, &mut report)?;
    }

    // Unconfigured array ids have no header, so every row is a mismatch
    let configured: Vec<&str> = logger
        .array_ids
        .iter()
        .map(|(id, cfg)| cfg.options.display_name(id))
        .collect();
    for (name, buckets) in data.iter().filter(|(name, _)| !configured.contains(name)) {
        let assignment = assign_array_headers(buckets, None);
        debug!("Array id {} is not configured", name);
        export_unit_mismatches(&target, name, &assignment.mismatches, &mut report)?;
    }

    Ok(report)
}
