//! Pipeline configuration.

use std::path::PathBuf;

use docseal_core::{ConfigError, EnvSource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Parent of per-upload working directories. `None` uses the system
    /// temporary directory.
    pub temp_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(env: &EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            temp_dir: env.get("TEMP_DIR").map(PathBuf::from),
        })
    }
}
