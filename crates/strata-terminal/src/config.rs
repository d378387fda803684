//! Renderer configuration.
//!
//! ```toml
//! target_fps = 30
//! mode = "fixed"
//! stop_timeout_ms = 250
//! max_fanout = 16
//! min_fanout = 4
//! skip_occluded = true
//! ```

use crate::error::{Result, StrataError};
use crate::scheduler::{RenderMode, SchedulerConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use strata_index::IndexConfig;

/// Settings for the renderer, its spatial index and its scheduler.
///
/// Every field is optional in TOML; missing fields take the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Frames per second.
    pub target_fps: u32,
    /// Frame policy.
    pub mode: RenderMode,
    /// How long stopping waits for the render thread.
    pub stop_timeout_ms: u64,
    /// Maximum children per R-tree node.
    pub max_fanout: usize,
    /// Minimum children per non-root R-tree node.
    pub min_fanout: usize,
    /// Skip painting elements hidden behind a single higher element.
    pub skip_occluded: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            mode: RenderMode::OnDemand,
            stop_timeout_ms: 500,
            max_fanout: 8,
            min_fanout: 2,
            skip_occluded: true,
        }
    }
}

impl RenderConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StrataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise as
    /// [`RenderConfig::from_toml_str`].
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            return Err(StrataError::Config("target_fps must be positive".into()));
        }
        if self.max_fanout < IndexConfig::MIN_MAX_FANOUT {
            return Err(StrataError::Config(format!(
                "max_fanout must be at least {}, got {}",
                IndexConfig::MIN_MAX_FANOUT,
                self.max_fanout
            )));
        }
        if self.min_fanout < 2 {
            return Err(StrataError::Config(format!(
                "min_fanout must be at least 2, got {}",
                self.min_fanout
            )));
        }
        if self.min_fanout > self.max_fanout / 2 {
            return Err(StrataError::Config(format!(
                "min_fanout {} exceeds half of max_fanout {}",
                self.min_fanout, self.max_fanout
            )));
        }
        Ok(())
    }

    /// Scheduler part of the configuration.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            target_fps: self.target_fps,
            mode: self.mode,
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }

    /// Spatial index part of the configuration.
    #[must_use]
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            max_fanout: self.max_fanout,
            min_fanout: self.min_fanout,
            ..IndexConfig::default()
        }
    }
}

impl From<&RenderConfig> for SchedulerConfig {
    fn from(config: &RenderConfig) -> Self {
        config.scheduler_config()
    }
}

impl From<&RenderConfig> for IndexConfig {
    fn from(config: &RenderConfig) -> Self {
        config.index_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.mode, RenderMode::OnDemand);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RenderConfig::from_toml_str("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = RenderConfig::from_toml_str("target_fps = 30\nmode = \"fixed\"").unwrap();
        assert_eq!(config.target_fps, 30);
        assert_eq!(config.mode, RenderMode::Fixed);
        assert_eq!(config.max_fanout, 8);
        assert!(config.skip_occluded);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for source in [
            "target_fps = 0",
            "min_fanout = 1",
            "max_fanout = 3",
            "max_fanout = 6\nmin_fanout = 4",
        ] {
            let err = RenderConfig::from_toml_str(source).unwrap_err();
            assert!(matches!(err, StrataError::Config(_)), "{source}");
        }
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(RenderConfig::from_toml_str("target_fps = \"fast\"").is_err());
        assert!(RenderConfig::from_toml_str("unknown_field = 1").is_err());
    }

    #[test]
    fn test_conversions() {
        let config = RenderConfig::from_toml_str(
            "target_fps = 30\nstop_timeout_ms = 100\nmax_fanout = 16\nmin_fanout = 4",
        )
        .unwrap();
        let scheduler = SchedulerConfig::from(&config);
        assert_eq!(scheduler.target_fps, 30);
        assert_eq!(scheduler.stop_timeout, Duration::from_millis(100));

        let index = IndexConfig::from(&config);
        assert_eq!(index.max_fanout, 16);
        assert_eq!(index.min_fanout, 4);
        assert!(index.is_valid());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = RenderConfig::load_from_file("/nonexistent/strata.toml").unwrap_err();
        assert!(matches!(err, StrataError::Io(_)));
    }
}
