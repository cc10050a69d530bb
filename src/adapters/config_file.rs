//! JSON config file adapter.
//!
//! Implements [`ConfigPort`] on top of a single JSON document.  Missing
//! fields take their defaults, so a file only needs to carry what differs
//! from the stock deployment.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a crash mid-save never leaves a truncated config behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::BridgeConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ConfigError::NotFound),
            Err(e) => return Err(ConfigError::IoError(e.to_string())),
        };
        let cfg: BridgeConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        info!("Config: loaded {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &BridgeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text).map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        info!("Config: saved {}", self.path.display());
        Ok(())
    }
}
