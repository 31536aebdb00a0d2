//! Run configuration: calculation knobs plus column aliases, loadable from TOML.
//!
//! ```toml
//! [calc]
//! num_peers = 3
//! peer_return_truncation = 2.0
//!
//! [columns]
//! time = "ts"
//! bid_price = "bid"
//! ```

use crate::schema::ColumnMapping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tcalab_core::CalcConfig;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub calc: CalcConfig,
    pub columns: ColumnMapping,
}

impl RunnerConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(content)?;
        config
            .calc
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
