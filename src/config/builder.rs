//! Builder for `ScannerConfig`
//!
//! All fields have defaults, so the builder has a single state. `build()`
//! validates the bounds that the scheduler and orchestrator rely on.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::ScannerConfig;

#[derive(Debug, Clone, Default)]
pub struct ScannerConfigBuilder {
    pub(crate) inner: ScannerConfig,
}

impl ScannerConfig {
    /// Create a builder for configuring a `ScannerConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScannerConfigBuilder {
        ScannerConfigBuilder::default()
    }

    /// Load a config from a JSON file. Missing keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` when the file cannot be read,
    /// `ConfigError::Parse` for malformed JSON and `ConfigError::Invalid`
    /// when the values fail validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: ScannerConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every consumer assumes
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_load_timeout_secs() == 0 {
            return Err(ConfigError::Invalid {
                field: "page_load_timeout_secs",
                reason: "must be positive".into(),
            });
        }
        if self.max_pages_per_source() == 0 {
            return Err(ConfigError::Invalid {
                field: "max_pages_per_source",
                reason: "must be at least 1".into(),
            });
        }
        if self.min_interval_secs() == 0 {
            return Err(ConfigError::Invalid {
                field: "min_interval_secs",
                reason: "must be positive".into(),
            });
        }
        if self.min_interval_secs() > self.max_interval_secs() {
            return Err(ConfigError::Invalid {
                field: "max_interval_secs",
                reason: format!(
                    "{} is below min_interval_secs {}",
                    self.max_interval_secs(),
                    self.min_interval_secs()
                ),
            });
        }
        if self.event_capacity() == 0 {
            return Err(ConfigError::Invalid {
                field: "event_capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl ScannerConfigBuilder {
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.chrome_data_dir = Some(dir.into());
        self
    }

    /// Validate and produce the config
    ///
    /// # Errors
    ///
    /// See [`ScannerConfig::validate`].
    pub fn build(self) -> Result<ScannerConfig, ConfigError> {
        let config = self.inner;
        config.validate()?;
        Ok(config)
    }
}
