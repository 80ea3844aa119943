//! Settings loading, validation, and conversion.

use super::model::Settings;
use crate::locks::SemaphoreConfig;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::time::Duration;

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings =
            serde_yaml::from_str(yaml).context("failed to parse config YAML")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }

    /// Validate settings values.
    ///
    /// Validation rules:
    /// - `retry_interval_ms` must be positive
    /// - `tag`, when set, must be a single line
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval_ms == 0 {
            bail!("config validation failed: retry_interval_ms must be greater than 0");
        }

        if let Some(tag) = &self.tag
            && tag.contains(['\n', '\r'])
        {
            bail!("config validation failed: tag must be a single line");
        }

        Ok(())
    }

    /// Stale timeout as a duration; `None` when disabled with 0.
    pub fn stale_timeout(&self) -> Option<Duration> {
        (self.stale_seconds > 0).then(|| Duration::from_secs(self.stale_seconds))
    }

    /// Build the library configuration these settings describe.
    pub fn semaphore_config(&self) -> SemaphoreConfig {
        SemaphoreConfig {
            stale_timeout: self.stale_timeout(),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            acquire_timeout: self.acquire_timeout_seconds.map(Duration::from_secs),
        }
    }
}
