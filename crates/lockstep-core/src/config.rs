use eyre::{Result, WrapErr, ensure};
use serde::Deserialize;
use std::{fs, path::Path};

/// Configuration parameters that are passed to
/// [TimeSynchronizer](crate::TimeSynchronizer) and [sync](crate::sync()).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The number of input channels. Fixed for the lifetime of the
    /// synchronizer.
    pub channels: usize,
    /// The maximum number of distinct timestamps kept for each channel.
    pub queue_size: usize,
}

impl Config {
    pub fn new(channels: usize, queue_size: usize) -> Self {
        Self {
            channels,
            queue_size,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.channels >= 2,
            "channels must be at least 2, got {}",
            self.channels
        );
        ensure!(
            self.queue_size >= 1,
            "queue_size must be at least 1, got {}",
            self.queue_size
        );
        Ok(())
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(text).wrap_err("Failed to parse synchronizer config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml_str(&contents)
            .wrap_err_with(|| format!("Invalid config file: {}", path.display()))
    }
}
