//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::domain::{FrequencyRange, PerformanceFactor};
use crate::error::{ConfigError, DomainError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Device selection settings
    pub device: DeviceConfig,
    /// Frequency control settings
    pub frequency: FrequencyConfig,
    /// Performance factor settings
    pub performance: PerformanceConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
    /// Dry run mode
    pub dry_run: bool,
}

/// Device selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// DRM card index
    pub card: u32,
    /// Root that `/sys` paths are resolved against
    pub sysfs_root: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            card: 0,
            sysfs_root: PathBuf::from("/"),
        }
    }
}

/// Frequency control configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Lower clock limit in MHz
    pub min_mhz: Option<f64>,
    /// Upper clock limit in MHz
    pub max_mhz: Option<f64>,
}

impl FrequencyConfig {
    /// Convert to a validated range, if both limits are set
    pub fn to_range(&self) -> Result<Option<FrequencyRange>, ConfigError> {
        match (self.min_mhz, self.max_mhz) {
            (None, None) => Ok(None),
            (Some(min), Some(max)) => {
                let range = FrequencyRange::new(min, max);
                range.validate().map_err(|e| invalid("frequency", e))?;
                Ok(Some(range))
            }
            _ => Err(ConfigError::InvalidValue {
                key: "frequency".to_string(),
                message: "min_mhz and max_mhz must be set together".to_string(),
            }),
        }
    }
}

/// Performance factor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Media engine factor (0-100)
    pub media_factor: Option<f64>,
    /// Compute engine factor (0-100)
    pub compute_factor: Option<f64>,
}

impl PerformanceConfig {
    /// Validated media factor
    pub fn media(&self) -> Result<Option<PerformanceFactor>, ConfigError> {
        factor("performance.media_factor", self.media_factor)
    }

    /// Validated compute factor
    pub fn compute(&self) -> Result<Option<PerformanceFactor>, ConfigError> {
        factor("performance.compute_factor", self.compute_factor)
    }
}

fn factor(key: &str, value: Option<f64>) -> Result<Option<PerformanceFactor>, ConfigError> {
    value
        .map(PerformanceFactor::new)
        .transpose()
        .map_err(|e| invalid(key, e))
}

fn invalid(key: &str, err: DomainError) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device.card, 0);
        assert_eq!(config.device.sysfs_root, PathBuf::from("/"));
        assert!(config.frequency.to_range().unwrap().is_none());
        assert!(config.performance.media().unwrap().is_none());
    }

    #[test]
    fn test_parse_sections() {
        let config: Config = toml::from_str(
            r#"
            [device]
            card = 1

            [frequency]
            min_mhz = 300
            max_mhz = 1200

            [performance]
            compute_factor = 25.0
            "#,
        )
        .unwrap();

        assert_eq!(config.device.card, 1);
        assert_eq!(config.device.sysfs_root, PathBuf::from("/"));
        assert_eq!(
            config.frequency.to_range().unwrap(),
            Some(FrequencyRange::new(300.0, 1200.0))
        );
        assert_eq!(
            config.performance.compute().unwrap().map(|f| f.value()),
            Some(25.0)
        );
    }

    #[test]
    fn test_half_range_rejected() {
        let config = FrequencyConfig {
            min_mhz: Some(300.0),
            max_mhz: None,
        };
        assert!(matches!(
            config.to_range(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_out_of_range_factor_rejected() {
        let config = PerformanceConfig {
            media_factor: Some(150.0),
            compute_factor: None,
        };
        assert!(config.media().is_err());
    }
}
