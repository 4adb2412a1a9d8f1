//! Configuration management and validation.
//!
//! The configuration file is a YAML tree of
//! `sites → locations → dataloggers → (array ids | tables)`. Each leaf
//! records the source file path and the last processed line number
//! (`line_num`), which acts as a resumable cursor. Everything is parsed
//! into typed structs once, at load time, and validated before any
//! processing starts.

use crate::constants::{DEFAULT_HEADER_VARIANT, DEFAULT_TIME_PARSED_COLUMN};
use crate::error::{FormatterError, Result};
use crate::models::ColumnKey;
use crate::time::{TimeFormat, TimeFormatSpec};
use chrono_tz::Tz;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// String-keyed map that keeps YAML declaration order
///
/// Processing order and header variant precedence both follow the order in
/// which entries appear in the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(OrderedMap::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((MapKey(key), value)) = access.next_entry::<MapKey, V>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate key '{}'", key)));
            }
            entries.push((key, value));
        }
        Ok(OrderedMap(entries))
    }
}

/// Map key accepting YAML strings and scalars (array ids are often bare integers)
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = MapKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftp: Option<FtpSettings>,

    #[serde(default)]
    pub sites: OrderedMap<SiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Inactive systems skip processing entirely
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_output_dir: Option<PathBuf>,

    /// Optional root for Parquet snapshots of every exported table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parquet_output_dir: Option<PathBuf>,
}

/// FTP server used to publish finished exports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtpSettings {
    /// `host` or `host:port`
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Remote directory under which the site tree is mirrored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_root: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub locations: OrderedMap<LocationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub dataloggers: OrderedMap<DataloggerConfig>,
}

/// How a datalogger lays out its memory, and therefore its files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryStructure {
    #[serde(rename = "mixed array")]
    MixedArray,
    #[serde(rename = "table based")]
    TableBased,
}

/// Supported datalogger models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggerModel {
    #[serde(rename = "CR10X", alias = "cr10x")]
    Cr10x,
    #[serde(rename = "CR1000", alias = "cr1000")]
    Cr1000,
}

impl LoggerModel {
    pub fn time_format(self) -> TimeFormat {
        match self {
            LoggerModel::Cr10x => TimeFormat::Legacy,
            LoggerModel::Cr1000 => TimeFormat::Modern,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataloggerConfig {
    pub memory_structure: MemoryStructure,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger_model: Option<LoggerModel>,

    /// Source file of a mixed-array datalogger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Cursor of a mixed-array datalogger
    #[serde(default)]
    pub line_num: usize,

    #[serde(default = "default_time_zone")]
    pub time_zone: Tz,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format_args_library: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub array_ids: OrderedMap<ArrayIdConfig>,

    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub tables: OrderedMap<TableConfig>,
}

impl DataloggerConfig {
    /// Time strategy: the configured model wins, else the memory structure decides
    pub fn time_format(&self) -> TimeFormat {
        match (self.logger_model, self.memory_structure) {
            (Some(model), _) => model.time_format(),
            (None, MemoryStructure::MixedArray) => TimeFormat::Legacy,
            (None, MemoryStructure::TableBased) => TimeFormat::Modern,
        }
    }

    pub fn time_format_spec(&self) -> Result<TimeFormatSpec> {
        TimeFormatSpec::resolve(self.time_format(), self.time_format_args_library.as_deref())
    }
}

/// Export settings shared by array ids and tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitOptions {
    /// Display name used for output files; defaults to the config key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Columns kept on export; all columns when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_columns: Option<Vec<String>>,

    /// Raw columns feeding the primary timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_columns: Option<Vec<ColumnKey>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_parsed_column_name: Option<String>,

    #[serde(default)]
    pub to_utc: bool,

    #[serde(default)]
    pub include_time_zone: bool,

    /// Derived columns recomputed from other raw columns
    #[serde(
        default,
        alias = "convert_column_values",
        skip_serializing_if = "OrderedMap::is_empty"
    )]
    pub convert_data_column_values: OrderedMap<ConvertColumnSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParameterExport>,
}

impl UnitOptions {
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    pub fn time_parsed_column(&self) -> &str {
        self.time_parsed_column_name
            .as_deref()
            .unwrap_or(DEFAULT_TIME_PARSED_COLUMN)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArrayIdConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_names: Option<HeaderSpec>,

    #[serde(flatten)]
    pub options: UnitOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub file_path: PathBuf,

    #[serde(default)]
    pub line_num: usize,

    /// Line index holding the quoted header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_row: Option<usize>,

    /// First data line; defaults to the line after the header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_row: Option<usize>,

    /// Explicit header, used instead of `header_row` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_names: Option<Vec<String>>,

    /// Overrides the datalogger's time zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<Tz>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format_args_library: Option<Vec<String>>,

    #[serde(default)]
    pub fix_floats: bool,

    #[serde(flatten)]
    pub options: UnitOptions,
}

/// Header definition for an array id: a single list or named variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderSpec {
    Single(Vec<String>),
    Variants(OrderedMap<Vec<String>>),
}

impl HeaderSpec {
    /// Variants in declaration order; a flat list is the `default` variant
    pub fn variants(&self) -> Vec<(&str, &[String])> {
        match self {
            HeaderSpec::Single(columns) => vec![(DEFAULT_HEADER_VARIANT, columns.as_slice())],
            HeaderSpec::Variants(map) => map.iter().map(|(k, v)| (k, v.as_slice())).collect(),
        }
    }
}

/// Recomputation of one column from a different set of raw columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertColumnSpec {
    pub value_type: String,

    #[serde(default)]
    pub value_time_columns: Vec<ColumnKey>,
}

/// Per-parameter time series export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParameterExport {
    /// One file per column
    Parameter { columns: Vec<String> },
    /// Columns stacked by depth into a single file
    Profile {
        name: String,
        columns: Vec<String>,
        depths: Vec<f64>,
    },
}

/// A single processable leaf of the configuration tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitId {
    pub site: String,
    pub location: String,
    pub datalogger: String,
    pub table: Option<String>,
}

impl UnitId {
    /// `site/location/datalogger`, the directory every output of the unit lives under
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(&self.site)
            .join(&self.location)
            .join(&self.datalogger)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.location, self.datalogger)?;
        if let Some(table) = &self.table {
            write!(f, "/{}", table)?;
        }
        Ok(())
    }
}

/// Subset of the configuration tree selected on the command line
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub site: Option<String>,
    pub location: Option<String>,
    pub datalogger: Option<String>,
    pub table: Option<String>,
}

impl AppConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        debug!(
            "Loaded configuration from {} with {} sites",
            path.display(),
            config.sites.len()
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Persist the configuration, including advanced cursors
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        info!("Updated configuration file {}", path.display());
        Ok(())
    }

    /// Structural checks that do not depend on file contents
    pub fn validate(&self) -> Result<()> {
        for (site, site_cfg) in self.sites.iter() {
            for (location, location_cfg) in site_cfg.locations.iter() {
                for (datalogger, logger) in location_cfg.dataloggers.iter() {
                    let at = format!("{}/{}/{}", site, location, datalogger);
                    validate_datalogger(&at, logger)?;
                }
            }
        }
        Ok(())
    }

    /// Output root, falling back to the user's home directory
    pub fn output_dir(&self) -> PathBuf {
        match &self.settings.data_output_dir {
            Some(dir) => dir.clone(),
            None => {
                let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                info!(
                    "No output directory set! Files will be output to the user's default directory at {}",
                    home.display()
                );
                home
            }
        }
    }

    pub fn datalogger(&self, site: &str, location: &str, datalogger: &str) -> Result<&DataloggerConfig> {
        self.sites
            .get(site)
            .ok_or_else(|| FormatterError::unknown_scope("site", site))?
            .locations
            .get(location)
            .ok_or_else(|| FormatterError::unknown_scope("location", location))?
            .dataloggers
            .get(datalogger)
            .ok_or_else(|| FormatterError::unknown_scope("datalogger", datalogger))
    }

    fn datalogger_mut(&mut self, site: &str, location: &str, datalogger: &str) -> Result<&mut DataloggerConfig> {
        self.sites
            .get_mut(site)
            .ok_or_else(|| FormatterError::unknown_scope("site", site))?
            .locations
            .get_mut(location)
            .ok_or_else(|| FormatterError::unknown_scope("location", location))?
            .dataloggers
            .get_mut(datalogger)
            .ok_or_else(|| FormatterError::unknown_scope("datalogger", datalogger))
    }

    /// Current cursor of a unit
    pub fn cursor(&self, unit: &UnitId) -> Result<usize> {
        let logger = self.datalogger(&unit.site, &unit.location, &unit.datalogger)?;
        match &unit.table {
            None => Ok(logger.line_num),
            Some(table) => logger
                .tables
                .get(table)
                .map(|t| t.line_num)
                .ok_or_else(|| FormatterError::unknown_scope("table", table.as_str())),
        }
    }

    /// Advance a unit's cursor; cursors never move backwards
    pub fn set_cursor(&mut self, unit: &UnitId, line_num: usize) -> Result<()> {
        let logger = self.datalogger_mut(&unit.site, &unit.location, &unit.datalogger)?;
        let cursor = match &unit.table {
            None => &mut logger.line_num,
            Some(table) => {
                &mut logger
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| FormatterError::unknown_scope("table", table.as_str()))?
                    .line_num
            }
        };
        *cursor = (*cursor).max(line_num);
        Ok(())
    }

    /// Expand a scope into processable units, in configuration order
    pub fn select_units(&self, scope: &Scope) -> Result<Vec<UnitId>> {
        let mut units = Vec::new();

        for (site, site_cfg) in self.sites.iter() {
            if scope.site.as_deref().is_some_and(|s| s != site) {
                continue;
            }
            for (location, location_cfg) in site_cfg.locations.iter() {
                if scope.location.as_deref().is_some_and(|l| l != location) {
                    continue;
                }
                for (datalogger, logger) in location_cfg.dataloggers.iter() {
                    if scope.datalogger.as_deref().is_some_and(|d| d != datalogger) {
                        continue;
                    }
                    match logger.memory_structure {
                        MemoryStructure::MixedArray => {
                            if let Some(table) = &scope.table {
                                return Err(FormatterError::configuration(format!(
                                    "datalogger '{}' is a mixed array and has no table '{}'",
                                    datalogger, table
                                )));
                            }
                            units.push(UnitId {
                                site: site.to_string(),
                                location: location.to_string(),
                                datalogger: datalogger.to_string(),
                                table: None,
                            });
                        }
                        MemoryStructure::TableBased => {
                            for table in logger.tables.keys() {
                                if scope.table.as_deref().is_some_and(|t| t != table) {
                                    continue;
                                }
                                units.push(UnitId {
                                    site: site.to_string(),
                                    location: location.to_string(),
                                    datalogger: datalogger.to_string(),
                                    table: Some(table.to_string()),
                                });
                            }
                        }
                    }
                }
            }
        }

        // Explicitly named scopes must exist
        if let Some(site) = &scope.site {
            let site_cfg = self
                .sites
                .get(site)
                .ok_or_else(|| FormatterError::unknown_scope("site", site.as_str()))?;
            if let Some(location) = &scope.location {
                let location_cfg = site_cfg
                    .locations
                    .get(location)
                    .ok_or_else(|| FormatterError::unknown_scope("location", location.as_str()))?;
                if let Some(datalogger) = &scope.datalogger {
                    let logger = location_cfg
                        .dataloggers
                        .get(datalogger)
                        .ok_or_else(|| FormatterError::unknown_scope("datalogger", datalogger.as_str()))?;
                    if let Some(table) = &scope.table {
                        if logger.tables.get(table).is_none() {
                            return Err(FormatterError::unknown_scope("table", table.as_str()));
                        }
                    }
                }
            }
        }

        Ok(units)
    }
}

fn validate_datalogger(at: &str, logger: &DataloggerConfig) -> Result<()> {
    match logger.memory_structure {
        MemoryStructure::MixedArray => {
            if logger.file_path.is_none() {
                return Err(FormatterError::configuration(format!(
                    "{}: mixed array datalogger requires 'file_path'",
                    at
                )));
            }
            for (array_id, array_cfg) in logger.array_ids.iter() {
                if let Some(spec) = &array_cfg.column_names {
                    for (variant, columns) in spec.variants() {
                        if columns.is_empty() {
                            return Err(FormatterError::configuration(format!(
                                "{}: array id '{}' header variant '{}' is empty",
                                at, array_id, variant
                            )));
                        }
                        validate_header(&format!("{}/{}/{}", at, array_id, variant), columns)?;
                    }
                }
                validate_options(&format!("{}/{}", at, array_id), &array_cfg.options)?;
            }
            logger.time_format_spec()?;
        }
        MemoryStructure::TableBased => {
            if logger.tables.is_empty() {
                return Err(FormatterError::configuration(format!(
                    "{}: table based datalogger requires 'tables'",
                    at
                )));
            }
            for (table, table_cfg) in logger.tables.iter() {
                if let Some(columns) = &table_cfg.column_names {
                    validate_header(&format!("{}/{}", at, table), columns)?;
                }
                validate_options(&format!("{}/{}", at, table), &table_cfg.options)?;
                let library = table_cfg
                    .time_format_args_library
                    .as_deref()
                    .or(logger.time_format_args_library.as_deref());
                TimeFormatSpec::resolve(logger.time_format(), library)?;
            }
        }
    }
    Ok(())
}

/// Column names must be unique for rows to keep one value per column
fn validate_header(at: &str, columns: &[String]) -> Result<()> {
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].contains(column) {
            return Err(FormatterError::configuration(format!(
                "{}: duplicate column name '{}'",
                at, column
            )));
        }
    }
    Ok(())
}

fn validate_options(at: &str, options: &UnitOptions) -> Result<()> {
    if options.parameters.is_some() && options.time_columns.is_none() {
        return Err(FormatterError::configuration(format!(
            "{}: parameter export requires 'time_columns'",
            at
        )));
    }
    if let Some(ParameterExport::Profile { columns, depths, .. }) = &options.parameters {
        if columns.len() != depths.len() {
            return Err(FormatterError::configuration(format!(
                "{}: profile export has {} columns but {} depths",
                at,
                columns.len(),
                depths.len()
            )));
        }
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_time_zone() -> Tz {
    Tz::UTC
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
settings:
  active: true
  data_output_dir: /tmp/out
sites:
  lake:
    locations:
      lake_location:
        dataloggers:
          cr10x:
            memory_structure: mixed array
            file_path: /data/lake.dat
            line_num: 12
            time_zone: Europe/Stockholm
            array_ids:
              101:
                name: Lake Temp
                column_names:
                  default: [ID, Year, Day, Time, Temp]
                  short: [ID, Year, Day, Time]
                export_columns: [Timestamp, Temp]
                time_columns: [Year, Day, Time]
                to_utc: true
              '102':
                column_names: [ID, Year, Day, Time, Battery]
          cr1000:
            memory_structure: table based
            tables:
              Table1:
                file_path: /data/table1.dat
                header_row: 1
                time_columns: [TIMESTAMP]
"#;

    #[test]
    fn test_load_preserves_declaration_order() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        let logger = config.datalogger("lake", "lake_location", "cr10x").unwrap();

        assert_eq!(logger.array_ids.keys().collect::<Vec<_>>(), vec!["101", "102"]);
        assert_eq!(logger.time_zone, chrono_tz::Europe::Stockholm);
        assert_eq!(logger.time_format(), TimeFormat::Legacy);

        let array = logger.array_ids.get("101").unwrap();
        let variants = array.column_names.as_ref().unwrap().variants();
        assert_eq!(variants[0].0, "default");
        assert_eq!(variants[1].0, "short");
        assert_eq!(array.options.display_name("101"), "Lake Temp");
        assert_eq!(array.options.time_parsed_column(), "Timestamp");
        assert!(array.options.to_utc);
    }

    #[test]
    fn test_flat_header_is_default_variant() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        let logger = config.datalogger("lake", "lake_location", "cr10x").unwrap();
        let spec = logger.array_ids.get("102").unwrap().column_names.as_ref().unwrap();
        let variants = spec.variants();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].0, DEFAULT_HEADER_VARIANT);
    }

    #[test]
    fn test_select_units_by_scope() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();

        let all = config.select_units(&Scope::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].table, None);
        assert_eq!(all[1].table.as_deref(), Some("Table1"));

        let scope = Scope {
            site: Some("lake".into()),
            location: Some("lake_location".into()),
            datalogger: Some("cr1000".into()),
            table: None,
        };
        let units = config.select_units(&scope).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].to_string(), "lake/lake_location/cr1000/Table1");
    }

    #[test]
    fn test_unknown_scope_is_reported() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        let scope = Scope {
            site: Some("river".into()),
            ..Default::default()
        };
        let err = config.select_units(&scope).unwrap_err();
        assert!(matches!(err, FormatterError::UnknownScope { kind: "site", .. }));
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut config = AppConfig::from_yaml(SAMPLE).unwrap();
        let unit = config.select_units(&Scope::default()).unwrap().remove(0);

        config.set_cursor(&unit, 20).unwrap();
        assert_eq!(config.cursor(&unit).unwrap(), 20);
        config.set_cursor(&unit, 5).unwrap();
        assert_eq!(config.cursor(&unit).unwrap(), 20);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = AppConfig::from_yaml(SAMPLE).unwrap();
        let units = config.select_units(&Scope::default()).unwrap();
        config.set_cursor(&units[1], 42).unwrap();
        config.save(&path).unwrap();

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.cursor(&units[0]).unwrap(), 12);
        assert_eq!(reloaded.cursor(&units[1]).unwrap(), 42);
        let logger = reloaded.datalogger("lake", "lake_location", "cr10x").unwrap();
        assert_eq!(logger.array_ids.keys().collect::<Vec<_>>(), vec!["101", "102"]);
    }

    #[test]
    fn test_mixed_array_requires_file_path() {
        let yaml = r#"
settings: {}
sites:
  s:
    locations:
      l:
        dataloggers:
          d:
            memory_structure: mixed array
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FormatterError::Configuration { .. }));
    }

    #[test]
    fn test_unsupported_memory_structure_rejected() {
        let yaml = r#"
settings: {}
sites:
  s:
    locations:
      l:
        dataloggers:
          d:
            memory_structure: ring buffer
"#;
        assert!(matches!(
            AppConfig::from_yaml(yaml).unwrap_err(),
            FormatterError::Yaml(_)
        ));
    }

    #[test]
    fn test_duplicate_column_names_rejected() {
        let yaml = r#"
settings: {}
sites:
  s:
    locations:
      l:
        dataloggers:
          d:
            memory_structure: mixed array
            file_path: x.dat
            array_ids:
              '1':
                column_names: [ID, T, T]
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate column name 'T'"));
    }

    #[test]
    fn test_profile_lengths_must_agree() {
        let yaml = r#"
settings: {}
sites:
  s:
    locations:
      l:
        dataloggers:
          d:
            memory_structure: mixed array
            file_path: x.dat
            array_ids:
              '1':
                column_names: [ID, T1, T2]
                time_columns: [T1]
                parameters:
                  kind: profile
                  name: WaterTemp
                  columns: [T1, T2]
                  depths: [0.5]
"#;
        assert!(matches!(
            AppConfig::from_yaml(yaml).unwrap_err(),
            FormatterError::Configuration { .. }
        ));
    }
}
