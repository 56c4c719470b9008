//! File-based configuration.
//!
//! ```toml
//! data_dir = "data"
//! version = 2
//!
//! [sql_log]
//! enabled = true
//! level = "info"
//! max_sql_length = 500
//! ```

use crate::error::{DbtoolError, DbtoolResult};
use crate::sql_log::SqlLogConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where databases live and how they are opened.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DbtoolConfig {
    /// Directory holding one file per database.
    pub data_dir: PathBuf,
    /// Schema version passed to the open callbacks. Must be at least 1.
    pub version: i32,
    pub sql_log: SqlLogConfig,
}

impl Default for DbtoolConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            version: 1,
            sql_log: SqlLogConfig::default(),
        }
    }
}

impl DbtoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(raw: &str) -> DbtoolResult<Self> {
        let config: DbtoolConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file. A relative `data_dir` is resolved against
    /// the file's directory.
    pub fn load(path: impl AsRef<Path>) -> DbtoolResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbtoolError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|e| {
            DbtoolError::Config(format!("failed to parse config file {}: {e}", path.display()))
        })?;
        if config.data_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.data_dir = base.join(&config.data_dir);
        }
        Ok(config)
    }

    pub fn validate(&self) -> DbtoolResult<()> {
        if self.version < 1 {
            return Err(DbtoolError::Config(format!(
                "version must be at least 1, got {}",
                self.version
            )));
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_sql_log(mut self, sql_log: SqlLogConfig) -> Self {
        self.sql_log = sql_log;
        self
    }
}
