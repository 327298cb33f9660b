//! # Session Module
//!
//! Wires decoder, frame source, renderer, audio and scheduler into one
//! playback run, owning the setup and teardown ordering.

pub mod engine;

pub use engine::{PlaybackEngine, SessionOptions};
