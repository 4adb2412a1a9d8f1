//! Pipeline tests for the processor module
//!
//! Each test writes a small logger file and a matching configuration into a
//! temporary directory and runs the processor against them.

pub mod mixed_array_tests;

use crate::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Five lines: array id 101 three times with 4 fields, 201 twice with 6
pub const MIXED_ARRAY_FILE: &str = "101,2020,45,830
201,2020,45,830,.5,-.5
101,2020,45,840
201,2020,45,840,1.5,2
101,2020,45,850
";

pub const TABLE_FILE: &str = "\"TOA5\",\"CR1000\",\"Table1\"
\"TIMESTAMP\",\"RECORD\",\"AirTemp\",\"RH\"
\"TS\",\"RN\",\"Deg C\",\"%\"
\"2021-06-01 12:00:00\",1,21.5,.5
\"2021-06-01 12:10:00\",2,21.7,60
\"2021-06-01 12:20:00\",3,22.0
";

/// Scratch layout shared by the tests
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn append(&self, name: &str, content: &str) {
        use std::io::Write;
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(self.dir.path().join(name))
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn output(&self, relative: &str) -> PathBuf {
        self.output_dir().join(relative)
    }

    pub fn read_output(&self, relative: &str) -> String {
        fs::read_to_string(self.output(relative)).unwrap()
    }

    /// Configuration with `{dir}` replaced by the scratch directory
    pub fn config(&self, yaml: &str) -> AppConfig {
        AppConfig::from_yaml(&yaml.replace("{dir}", &path_str(self.dir.path()))).unwrap()
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub fn lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}
