//! # Audio Transport Module
//!
//! The audio side of playback is an opaque transport: it is told to play
//! once, runs on its own real-time clock independent of the render loop, and
//! is told to stop once. The scheduler's entire timing model is anchored to
//! the instant the transport starts.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, Sink};
use tracing::info;

use crate::error::{AudioError, Result};

/// Opaque audio playback session.
pub trait AudioTransport {
    /// Start playback. Called exactly once per session.
    fn play(&mut self) -> Result<()>;

    /// Stop playback. Safe to call after any outcome of the render loop.
    fn stop(&mut self);
}

/// Rodio-backed transport playing a local audio file on the default output
/// device.
pub struct RodioTransport {
    // The stream must outlive the sink or playback goes silent.
    _stream: OutputStream,
    sink: Sink,
}

impl RodioTransport {
    /// Open the device and queue the track, paused, ready for `play`.
    pub fn load(path: &Path) -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceUnavailable {
                reason: e.to_string(),
            })?;
        let sink = Sink::try_new(&handle).map_err(|e| AudioError::DeviceUnavailable {
            reason: e.to_string(),
        })?;

        let file = File::open(path).map_err(|_| AudioError::LoadFailed {
            path: path.display().to_string(),
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            AudioError::UnsupportedFormat {
                reason: format!("{}: {}", path.display(), e),
            }
        })?;

        sink.append(source);
        sink.pause();
        info!("Audio track loaded from {:?}", path);

        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl AudioTransport for RodioTransport {
    fn play(&mut self) -> Result<()> {
        self.sink.play();
        Ok(())
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

/// Transport for muted playback and tests.
pub struct NullTransport;

impl AudioTransport for NullTransport {
    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}
