// src/config.rs
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

use crate::error::Result;

/// Where sources live, how to read them, and where outputs go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Canonical tables are written here.
    pub data_dir: PathBuf,
    pub physician_dir: PathBuf,
    /// Glob pattern for physician files inside `physician_dir`.
    pub physician_pattern: String,
    pub physician_footer_lines: usize,
    pub dme_file: PathBuf,
    pub dme_skip_rows: usize,
    pub injectable_file: PathBuf,
    pub injectable_skip_rows: usize,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("Program Data");
        Self {
            physician_dir: data_dir.join("Physician"),
            physician_pattern: "*.txt".into(),
            physician_footer_lines: 4,
            dme_file: data_dir.join("DME").join("DMEPOS_Jan.csv"),
            dme_skip_rows: 6,
            injectable_file: data_dir.join("Injectable").join("ASP_Pricing_File.csv"),
            injectable_skip_rows: 8,
            output_dir: PathBuf::from("Fee Schedule Output"),
            data_dir,
        }
    }
}

impl Config {
    /// Load from a YAML file; keys that are not given keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// `from_file` when a path is given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Full glob pattern for physician source files.
    pub fn physician_glob(&self) -> String {
        self.physician_dir
            .join(&self.physician_pattern)
            .to_string_lossy()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "dme_skip_rows: 7\noutput_dir: out")?;

        let cfg = Config::from_file(tmp.path())?;
        assert_eq!(cfg.dme_skip_rows, 7);
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.physician_footer_lines, 4);
        assert_eq!(cfg.injectable_skip_rows, 8);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/feesched.yaml"))).is_err());
        assert_eq!(Config::load(None).ok(), Some(Config::default()));
    }

    #[test]
    fn physician_glob_joins_dir_and_pattern() {
        let cfg = Config::default();
        assert!(cfg.physician_glob().ends_with("*.txt"));
        assert!(cfg.physician_glob().starts_with("Program Data"));
    }
}
