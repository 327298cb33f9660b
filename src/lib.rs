//! # Glyph-Projector
//!
//! Play videos as glyph-grid animations in the terminal, kept in sync with
//! the audio track.
//!
//! Decoded frames are quantized into character grids and painted by a
//! real-time scheduler that is anchored to the audio clock: when rendering
//! falls behind it skips ahead, when it runs fast it waits, so the picture
//! stays on the soundtrack no matter how slow the terminal is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glyph_projector::{
//!     config::Config,
//!     playback::CancelToken,
//!     session::{PlaybackEngine, SessionOptions},
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = PlaybackEngine::new(Config::default());
//! let options = SessionOptions {
//!     input: "frames/".into(),
//!     audio: Some("soundtrack.mp3".into()),
//!     captions: None,
//!     reuse_cache: false,
//! };
//! let stats = engine.play(&options, CancelToken::new())?;
//! println!("rendered {} frames", stats.rendered);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`render`] - glyph mapping, color quantization and terminal painting
//! - [`source`] - the three frame-supply strategies behind one trait
//! - [`playback`] - the adaptive scheduler, its clock and caption track
//! - [`video`] - the decoder boundary
//! - [`audio`] - the audio transport the timing model is anchored to
//! - [`session`] - the engine wiring a whole playback run together
//! - [`config`] - configuration management
//!
//! ## Frame Supply Strategies
//!
//! Three [`source::FrameSource`] implementations trade memory for latency:
//! precompute everything in memory, keep resized frames on disk and glyph-map
//! them on demand, or decode live during playback. The scheduler only ever
//! sees the trait.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod render;
pub mod session;
pub mod source;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{PlayerError, Result},
    playback::{CancelToken, PlaybackStats},
    session::{PlaybackEngine, SessionOptions},
};
