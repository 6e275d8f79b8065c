//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};

use std::path::PathBuf;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    pub fn with_file(mut self, path: Option<&str>) -> Self {
        let file_config = match path {
            Some(path) => match ConfigFile::load(path) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            },
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        self
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI dry-run flag
    pub fn with_dry_run(mut self, dry_run: Option<bool>) -> Self {
        if let Some(d) = dry_run {
            self.config.general.dry_run = d;
        }
        self
    }

    /// Override with CLI card index
    pub fn with_card(mut self, card: Option<u32>) -> Self {
        if let Some(c) = card {
            self.config.device.card = c;
        }
        self
    }

    /// Override with CLI sysfs root
    pub fn with_sysfs_root(mut self, root: Option<PathBuf>) -> Self {
        if let Some(r) = root {
            self.config.device.sysfs_root = r;
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build();
        assert!(!config.general.verbose);
        assert!(!config.general.dry_run);
        assert_eq!(config.device.card, 0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_verbose(Some(true))
            .with_dry_run(Some(true))
            .with_card(Some(1))
            .with_sysfs_root(Some(PathBuf::from("/tmp/fake")))
            .build();

        assert!(config.general.verbose);
        assert!(config.general.dry_run);
        assert_eq!(config.device.card, 1);
        assert_eq!(config.device.sysfs_root, PathBuf::from("/tmp/fake"));
    }

    #[test]
    fn test_missing_explicit_file_keeps_defaults() {
        let config = ConfigBuilder::new()
            .with_file(Some("/nonexistent/xesysman.toml"))
            .with_card(None)
            .build();
        assert_eq!(config.device.card, 0);
    }
}
