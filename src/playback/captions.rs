use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{CaptionError, Result};

/// One caption cue from a transcript file.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionCue {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// Caption lookup with a forward-only cursor.
///
/// Playback time only moves forward, so instead of rescanning the transcript
/// every frame the track keeps a monotonic cursor that advances past cues as
/// their start times are reached. When no cue covers the queried time the
/// previous cue is held on screen, matching how transcripts without explicit
/// gaps are expected to read.
pub struct CaptionTrack {
    cues: Vec<CaptionCue>,
    cursor: usize,
}

impl CaptionTrack {
    /// Load cues from a transcript file: a JSON array of
    /// `{"start": secs, "duration": secs, "text": "..."}` objects.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|_| CaptionError::LoadFailed {
            path: path.display().to_string(),
        })?;
        let cues: Vec<CaptionCue> =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                CaptionError::ParseFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
        info!("Loaded {} caption cues from {:?}", cues.len(), path);
        Ok(Self::new(cues))
    }

    pub fn new(mut cues: Vec<CaptionCue>) -> Self {
        cues.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        Self { cues, cursor: 0 }
    }

    /// The caption to show at `time` seconds. Only ever moves forward.
    pub fn caption_at(&mut self, time: f64) -> Option<&str> {
        if self.cues.is_empty() {
            return None;
        }

        while self.cursor + 1 < self.cues.len() && self.cues[self.cursor + 1].start <= time {
            self.cursor += 1;
        }

        if time < self.cues[self.cursor].start {
            return None;
        }
        Some(&self.cues[self.cursor].text)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}
