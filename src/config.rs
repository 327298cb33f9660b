use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::render::ColorMode;

/// Main configuration for the glyph-projector
///
/// Constructed once at startup and passed by reference into every component;
/// no component reads ambient process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Playback scheduling settings
    pub playback: PlaybackConfig,

    /// Glyph rendering settings
    pub render: RenderConfig,

    /// Frame acquisition settings
    pub source: SourceConfig,

    /// Audio transport settings
    pub audio: AudioConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            render: RenderConfig::default(),
            source: SourceConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;
        self.render.validate()?;
        self.source.validate()?;
        Ok(())
    }
}

/// Playback scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Requested display frame rate; frames are skipped, not slowed, to meet
    /// it. Absent or non-positive falls back to the source rate.
    pub display_fps: Option<f64>,

    /// Never jump ahead to catch up when rendering falls behind
    pub disable_adaptive_skip: bool,

    /// Show a live frames-per-second counter during playback
    pub debug_fps: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            display_fps: None,
            disable_adaptive_skip: false,
            debug_fps: false,
        }
    }
}

impl PlaybackConfig {
    fn validate(&self) -> Result<()> {
        if let Some(fps) = self.display_fps {
            if !fps.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key: "playback.display_fps".to_string(),
                    value: fps.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Glyph rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Cell coloring mode
    pub color: ColorMode,

    /// Upper bound on distinct paint handles for the session
    pub max_paints: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Mono,
            max_paints: 256,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if !(8..=256).contains(&self.max_paints) {
            return Err(ConfigError::InvalidValue {
                key: "render.max_paints".to_string(),
                value: self.max_paints.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Frame supply strategy, trading memory for latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStrategy {
    /// Transcode everything up front, O(1) frame lookup during playback
    Memory,
    /// Pre-resize frames to storage, glyph-map on demand
    Disk,
    /// Decode and transcode inline with playback
    Live,
}

impl FromStr for SourceStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "memory" => Ok(SourceStrategy::Memory),
            "disk" => Ok(SourceStrategy::Disk),
            "live" => Ok(SourceStrategy::Live),
            _ => Err(ConfigError::InvalidValue {
                key: "source.strategy".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Frame acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which frame-supply strategy to use
    pub strategy: SourceStrategy,

    /// Directory holding the resized frame cache (disk strategy)
    pub cache_dir: PathBuf,

    /// Frame rate assumed for directory-of-images inputs
    pub sequence_fps: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            strategy: SourceStrategy::Memory,
            cache_dir: PathBuf::from("glyph-cache"),
            sequence_fps: 30.0,
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if !(self.sequence_fps > 0.0) || !self.sequence_fps.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "source.sequence_fps".to_string(),
                value: self.sequence_fps.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Audio transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Play the audio track; disabled playback runs against a silent clock
    pub enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.playback.display_fps = Some(12.5);
        original_config.render.color = ColorMode::Extended;
        original_config.source.strategy = SourceStrategy::Disk;

        // Save and load
        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(
            original_config.playback.display_fps,
            loaded_config.playback.display_fps
        );
        assert_eq!(original_config.render.color, loaded_config.render.color);
        assert_eq!(
            original_config.source.strategy,
            loaded_config.source.strategy
        );
    }

    #[test]
    fn test_invalid_max_paints() {
        let mut config = Config::default();
        config.render.max_paints = 4;
        assert!(config.validate().is_err());
        config.render.max_paints = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sequence_fps() {
        let mut config = Config::default();
        config.source.sequence_fps = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_display_fps_is_allowed() {
        // Falls back to the source rate at runtime rather than failing.
        let mut config = Config::default();
        config.playback.display_fps = Some(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "memory".parse::<SourceStrategy>().unwrap(),
            SourceStrategy::Memory
        );
        assert_eq!(
            "disk".parse::<SourceStrategy>().unwrap(),
            SourceStrategy::Disk
        );
        assert_eq!(
            "live".parse::<SourceStrategy>().unwrap(),
            SourceStrategy::Live
        );
        assert!("vhs".parse::<SourceStrategy>().is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::from_file("definitely/not/here.toml");
        assert!(result.is_err());
    }
}
