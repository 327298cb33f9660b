use thiserror::Error;

/// Main error type for the glyph-projector library
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Audio transport error: {0}")]
    Audio(#[from] AudioError),

    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while acquiring or decoding video frames
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open video source: {path}")]
    OpenFailed { path: String },

    #[error("Unsupported video input: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid video metadata: {details}")]
    InvalidMetadata { details: String },

    #[error("Frame decode failed: {reason}")]
    DecodeFailed { reason: String },

    #[error("Failed to write cached frame: {path}")]
    CacheWriteFailed { path: String },

    #[error("Cache metadata unreadable: {path} - {reason}")]
    CacheMetadata { path: String, reason: String },
}

/// Terminal rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Terminal initialization failed: {reason}")]
    TerminalInit { reason: String },

    #[error("Terminal grid too small: {rows}x{cols}")]
    GridTooSmall { rows: u16, cols: u16 },
}

/// Audio transport errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output device available: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Failed to load audio track: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Caption track errors
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Failed to read transcript file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to parse transcript file: {path} - {reason}")]
    ParseFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using PlayerError
pub type Result<T> = std::result::Result<T, PlayerError>;

impl PlayerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Source(SourceError::OpenFailed { path }) => {
                format!("Could not open video source '{}'. Please check the path exists and is readable.", path)
            }
            Self::Source(SourceError::UnsupportedFormat { format }) => {
                format!("Unsupported input: {}", format)
            }
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio track '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
