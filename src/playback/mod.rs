//! # Playback Module
//!
//! The real-time heart of the player: an adaptive scheduler that keeps the
//! glyph stream synchronized to the audio clock despite variable rendering
//! cost, plus the injectable clock it runs on and the caption track it drives.
//!
//! Everything here is single-threaded and cooperative; the only suspension
//! point is the scheduler's deliberate wait step.

pub mod captions;
pub mod clock;
pub mod scheduler;

pub use captions::{CaptionCue, CaptionTrack};
pub use clock::{Clock, SystemClock};
pub use scheduler::{
    compute_skip_factor, CancelToken, PlaybackScheduler, PlaybackStats, SchedulerOptions,
    SKIP_THRESHOLD,
};
