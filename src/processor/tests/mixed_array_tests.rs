//! Mixed-array pipeline tests

use super::{Fixture, MIXED_ARRAY_FILE, lines};
use crate::config::{AppConfig, Scope};
use crate::error::FormatterError;
use crate::processor::Processor;
use std::fs;

const BASIC: &str = r#"
settings:
  data_output_dir: "{dir}/out"
sites:
  lake:
    locations:
      shore:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            file_path: "{dir}/lake.dat"
            array_ids:
              101:
                column_names: [ID, Year, Day, Time]
"#;

fn processor(fx: &Fixture, yaml: &str) -> Processor {
    Processor::new(fx.config(yaml)).with_output_dir(fx.output_dir())
}

#[test]
fn test_split_name_and_quarantine() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);

    let mut processor = processor(&fx, BASIC);
    let stats = processor.run(&Scope::default()).unwrap();

    assert_eq!(stats.units_processed, 1);
    assert_eq!(stats.units_failed, 0);
    assert_eq!(stats.rows_read, 5);
    assert_eq!(stats.rows_exported, 3);
    assert_eq!(stats.rows_quarantined, 2);
    assert_eq!(stats.files_written, 2);

    assert_eq!(
        fx.read_output("lake/shore/cr10x/101.dat"),
        "ID,Year,Day,Time\n101,2020,45,830\n101,2020,45,840\n101,2020,45,850\n"
    );
    assert_eq!(
        fx.read_output("lake/shore/cr10x/201 Mismatches.dat"),
        "201,2020,45,830,0.5,-0.5\n201,2020,45,840,1.5,2\n"
    );
}

#[test]
fn test_configured_array_without_header_is_quarantined() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let yaml = format!("{}              201:\n                name: Water\n", BASIC);

    let mut processor = processor(&fx, &yaml);
    let stats = processor.run(&Scope::default()).unwrap();

    assert_eq!(stats.rows_exported + stats.rows_quarantined, 5);
    assert_eq!(lines(&fx.read_output("lake/shore/cr10x/Water Mismatches.dat")).len(), 2);
    assert!(!fx.output("lake/shore/cr10x/Water.dat").exists());
}

#[test]
fn test_time_parsing_and_projection() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let yaml = r#"
settings: {}
sites:
  lake:
    locations:
      shore:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            logger_model: CR10X
            file_path: "{dir}/lake.dat"
            time_zone: Europe/Stockholm
            array_ids:
              101:
                name: Lake Temp
                column_names: [ID, Year, Day, Time]
                time_columns: [Year, Day, Time]
                export_columns: [Timestamp, Time]
                to_utc: true
"#;

    let mut processor = processor(&fx, yaml);
    processor.run(&Scope::default()).unwrap();

    let content = fx.read_output("lake/shore/cr10x/Lake Temp.dat");
    assert_eq!(
        lines(&content),
        vec![
            "Timestamp,Time",
            "2020-02-14 07:30:00+0000,830",
            "2020-02-14 07:40:00+0000,840",
            "2020-02-14 07:50:00+0000,850",
        ]
    );
}

#[test]
fn test_local_time_with_time_zone_column() {
    let fx = Fixture::new();
    fx.write("lake.dat", "101,2020,183,5\n101,2020,183,2400\n101,abc,1,1\n");
    let yaml = r#"
settings: {}
sites:
  lake:
    locations:
      shore:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            file_path: "{dir}/lake.dat"
            time_zone: Europe/Stockholm
            array_ids:
              101:
                column_names: [ID, Year, Day, Time]
                time_columns: [Year, Day, Time]
                time_parsed_column_name: Measured
                export_columns: [Measured]
                include_time_zone: true
"#;

    let mut processor = processor(&fx, yaml);
    processor.run(&Scope::default()).unwrap();

    assert_eq!(
        lines(&fx.read_output("lake/shore/cr10x/101.dat")),
        vec![
            "Measured,TimeZone",
            "2020-07-01 00:05:00+0200,Europe/Stockholm",
            "2020-07-02 00:00:00+0200,Europe/Stockholm",
            "1970-01-01 01:00:00+0100,Europe/Stockholm",
        ]
    );
}

#[test]
fn test_header_variants_export_separately() {
    let fx = Fixture::new();
    fx.write("lake.dat", "101,2020,45,830\n101,2020,45,840,.5\n101,1\n");
    let yaml = r#"
settings: {}
sites:
  lake:
    locations:
      shore:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            file_path: "{dir}/lake.dat"
            array_ids:
              101:
                column_names:
                  default: [ID, Year, Day, Time]
                  extended: [ID, Year, Day, Time, Temp]
"#;

    let mut processor = processor(&fx, yaml);
    let stats = processor.run(&Scope::default()).unwrap();

    assert_eq!(stats.rows_exported, 2);
    assert_eq!(stats.rows_quarantined, 1);
    assert_eq!(fx.read_output("lake/shore/cr10x/101.dat"), "ID,Year,Day,Time\n101,2020,45,830\n");
    assert_eq!(
        fx.read_output("lake/shore/cr10x/101 extended.dat"),
        "ID,Year,Day,Time,Temp\n101,2020,45,840,0.5\n"
    );
    assert_eq!(fx.read_output("lake/shore/cr10x/101 Mismatches.dat"), "101,1\n");
}

#[test]
fn test_rerun_from_cursor_adds_nothing() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);

    let mut processor = processor(&fx, BASIC);
    processor.run(&Scope::default()).unwrap();
    let unit = processor.config().select_units(&Scope::default()).unwrap().remove(0);
    assert_eq!(processor.config().cursor(&unit).unwrap(), 5);

    let first = fx.read_output("lake/shore/cr10x/101.dat");
    let first_mismatches = fx.read_output("lake/shore/cr10x/201 Mismatches.dat");

    let stats = processor.run(&Scope::default()).unwrap();
    assert_eq!(stats.rows_read, 0);
    assert_eq!(stats.rows_exported, 0);
    assert_eq!(fx.read_output("lake/shore/cr10x/101.dat"), first);
    assert_eq!(fx.read_output("lake/shore/cr10x/201 Mismatches.dat"), first_mismatches);
    assert_eq!(processor.config().cursor(&unit).unwrap(), 5);
}

#[test]
fn test_appended_lines_are_picked_up_once() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);

    let mut processor = processor(&fx, BASIC);
    processor.run(&Scope::default()).unwrap();

    fx.append("lake.dat", "\n101,2020,45,900\n");
    let stats = processor.run(&Scope::default()).unwrap();
    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.rows_exported, 1);

    let content = fx.read_output("lake/shore/cr10x/101.dat");
    assert_eq!(content.matches("ID,Year,Day,Time").count(), 1);
    assert_eq!(lines(&content).last(), Some(&"101,2020,45,900"));
    assert_eq!(lines(&content).len(), 5);
}

#[test]
fn test_tracking_persists_cursor() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let config_path = fx.write("config.yaml", &BASIC.replace("{dir}", &super::path_str(fx.dir.path())));

    let mut processor = Processor::new(AppConfig::load(&config_path).unwrap())
        .with_output_dir(fx.output_dir())
        .with_tracking(Some(config_path.clone()));
    processor.run(&Scope::default()).unwrap();

    let reloaded = AppConfig::load(&config_path).unwrap();
    let logger = reloaded.datalogger("lake", "shore", "cr10x").unwrap();
    assert_eq!(logger.line_num, 5);
}

#[test]
fn test_profile_parameters_and_parquet() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let yaml = r#"
settings: {}
sites:
  lake:
    locations:
      shore:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            file_path: "{dir}/lake.dat"
            array_ids:
              201:
                name: Water
                column_names: [ID, Year, Day, Time, T1, T2]
                time_columns: [Year, Day, Time]
                parameters:
                  kind: profile
                  name: WaterTemp
                  columns: [T1, T2]
                  depths: [0.5, 1.0]
"#;

    let mut processor = processor(&fx, yaml).with_parquet_dir(Some(fx.dir.path().join("parquet")));
    let stats = processor.run(&Scope::default()).unwrap();

    let profile = fx.read_output("lake/shore/cr10x/Water/WaterTemp.dat");
    assert_eq!(
        lines(&profile),
        vec![
            "TIMESTAMP,DEPTH,VALUE",
            "2020-02-14 08:30:00+0000,0.50,0.50",
            "2020-02-14 08:30:00+0000,1.00,-0.50",
            "2020-02-14 08:40:00+0000,0.50,1.50",
            "2020-02-14 08:40:00+0000,1.00,2.00",
        ]
    );

    let part = fx
        .dir
        .path()
        .join("parquet/lake/shore/cr10x/Water/part-00000000-00000005.parquet");
    assert!(part.exists());
    assert!(fs::metadata(part).unwrap().len() > 0);

    // Main file, profile file, parquet part and the unconfigured 101 mismatches
    assert_eq!(stats.files_written, 4);
}

#[test]
fn test_unsupported_conversion_fails_only_that_unit() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let yaml = r#"
settings: {}
sites:
  lake:
    locations:
      shore:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            file_path: "{dir}/lake.dat"
            array_ids:
              101:
                column_names: [ID, Year, Day, Time]
                convert_data_column_values:
                  Time:
                    value_type: depth
                    value_time_columns: [Year]
          second:
            memory_structure: mixed array
            file_path: "{dir}/lake.dat"
            array_ids:
              101:
                column_names: [ID, Year, Day, Time]
"#;

    let mut processor = processor(&fx, yaml);
    let stats = processor.run(&Scope::default()).unwrap();

    assert_eq!(stats.units_failed, 1);
    assert_eq!(stats.units_processed, 1);
    assert!(!fx.output("lake/shore/cr10x/101.dat").exists());
    assert!(fx.output("lake/shore/second/101.dat").exists());

    let units = processor.config().select_units(&Scope::default()).unwrap();
    assert_eq!(processor.config().cursor(&units[0]).unwrap(), 0);
    assert_eq!(processor.config().cursor(&units[1]).unwrap(), 5);
}

#[test]
fn test_missing_source_aborts_run() {
    let fx = Fixture::new();
    let mut processor = processor(&fx, BASIC);

    let err = processor.run(&Scope::default()).unwrap_err();
    assert!(matches!(err, FormatterError::SourceNotFound { .. }));
}

#[test]
fn test_bad_conversion_on_later_array_writes_nothing() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let yaml = format!(
        "{}              201:\n                column_names: [ID, Year, Day, Time, A, B]\n                convert_data_column_values:\n                  Time:\n                    value_type: depth\n                    value_time_columns: [Year]\n",
        BASIC
    );

    let mut processor = processor(&fx, &yaml);
    for _ in 0..2 {
        let stats = processor.run(&Scope::default()).unwrap();
        assert_eq!(stats.units_failed, 1);
    }

    assert!(!fx.output("lake/shore/cr10x/101.dat").exists());
    assert!(!fx.output("lake/shore/cr10x/201.dat").exists());
    let units = processor.config().select_units(&Scope::default()).unwrap();
    assert_eq!(processor.config().cursor(&units[0]).unwrap(), 0);
}

#[test]
fn test_time_columns_by_position() {
    let fx = Fixture::new();
    fx.write("lake.dat", MIXED_ARRAY_FILE);
    let yaml = format!("{}                time_columns: [1, 2, 3]\n", BASIC);

    let mut processor = processor(&fx, &yaml);
    let stats = processor.run(&Scope::default()).unwrap();

    assert_eq!(stats.units_failed, 0);
    assert_eq!(
        lines(&fx.read_output("lake/shore/cr10x/101.dat")),
        vec![
            "ID,Timestamp,Year,Day,Time",
            "101,2020-02-14 08:30:00+0000,2020,45,830",
            "101,2020-02-14 08:40:00+0000,2020,45,840",
            "101,2020-02-14 08:50:00+0000,2020,45,850",
        ]
    );
}
