//! Capture and scanning configuration.
//!
//! The defaults reproduce the tuned behaviour of the scanner: one focus
//! cycle per second and a VGA preview when no supported size fits the
//! display.

use super::Resolution;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the capture lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Delay between a focus cycle completing and the next one starting.
    pub focus_interval_ms: u64,
    /// Preview width used when no supported size fits the display.
    pub fallback_width: u32,
    /// Preview height used when no supported size fits the display.
    pub fallback_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            focus_interval_ms: 1000,
            fallback_width: 640,
            fallback_height: 480,
        }
    }
}

impl CaptureConfig {
    /// Returns the focus re-arm delay.
    pub fn focus_interval(&self) -> Duration {
        Duration::from_millis(self.focus_interval_ms)
    }

    /// Returns the geometry fallback resolution.
    pub fn fallback_resolution(&self) -> Resolution {
        Resolution::new(self.fallback_width, self.fallback_height)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.focus_interval_ms == 0 {
            return Err(ConfigError::InvalidFocusInterval);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A fallback dimension is zero.
    #[error("invalid fallback dimensions")]
    InvalidDimensions,
    /// The focus interval is zero.
    #[error("invalid focus interval (must be at least 1 ms)")]
    InvalidFocusInterval,
    /// The demo frame rate is outside 1-120.
    #[error("invalid demo frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[capture]` table.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// `[demo]` table.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Settings for the demonstration binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Frames to feed before exiting (ignored when running continuously).
    pub frames: u32,
    /// Frames per second fed into the mock camera.
    pub fps: u32,
    /// Leading frames without a code in view.
    pub blank_frames: u32,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 60,
            fps: 15,
            blank_frames: 10,
            metrics_port: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        if config.demo.fps == 0 || config.demo.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.focus_interval(), Duration::from_millis(1000));
        assert_eq!(config.fallback_resolution(), Resolution::new(640, 480));
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.fallback_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_parse_partial_file() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            focus_interval_ms = 250
            fallback_width = 320
            fallback_height = 240
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.focus_interval_ms, 250);
        assert_eq!(config.demo.fps, 15);
    }

    #[test]
    fn test_parse_rejects_zero_interval() {
        let result = FileConfig::from_toml(
            r#"
            [capture]
            focus_interval_ms = 0
            fallback_width = 640
            fallback_height = 480
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidFocusInterval)));
    }
}
