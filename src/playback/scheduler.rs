use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::audio::AudioTransport;
use crate::error::Result;
use crate::playback::captions::CaptionTrack;
use crate::playback::clock::Clock;
use crate::render::{GridRenderer, PaintHandle};
use crate::source::FrameSource;

/// How far behind the ideal schedule rendering may fall before frames are
/// dropped to catch up.
pub const SKIP_THRESHOLD: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag, set from the interrupt handler and observed
/// once per scheduler iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Playback parameters fixed for the whole session.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub total_frames: u64,
    pub source_fps: f64,
    /// Requested display rate; absent or non-positive falls back to the
    /// source rate.
    pub display_fps: Option<f64>,
    /// When set, never jump ahead to catch up (video may drift out of sync).
    pub disable_adaptive_skip: bool,
    /// Show a live frames-per-second counter in the top-right corner.
    pub debug_fps: bool,
    pub fps_paint: Option<PaintHandle>,
}

/// Counters reported after a playback run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// Stride, in source-frame units, between consecutive displayed frames.
///
/// This is how a lower requested display rate is realized without slowing the
/// audio down: frames are dropped, not stretched.
pub fn compute_skip_factor(source_fps: f64, display_fps: Option<f64>) -> u64 {
    let effective = match display_fps {
        Some(fps) if fps > 0.0 => fps,
        _ => source_fps,
    };
    ((source_fps / effective).round() as u64).max(1)
}

/// The real-time playback loop.
///
/// Timing is computed against a single immutable anchor captured the moment
/// the audio transport is told to play; the audio runs on its own clock and is
/// never touched again until the final stop. Every iteration decides between
/// three actions for the current frame index:
///
/// 1. the renderer is behind schedule -> advance by the skip factor without
///    rendering (unless adaptive skip is disabled),
/// 2. the renderer is ahead of schedule -> sleep the difference,
/// 3. on schedule -> fetch, render, advance by the skip factor.
///
/// Frame indices only ever move forward, so rendered frames are strictly
/// increasing and no frame is rendered twice.
pub struct PlaybackScheduler<C: Clock> {
    opts: SchedulerOptions,
    skip_factor: u64,
    clock: C,
}

impl<C: Clock> PlaybackScheduler<C> {
    pub fn new(opts: SchedulerOptions, clock: C) -> Self {
        let skip_factor = compute_skip_factor(opts.source_fps, opts.display_fps);
        Self {
            opts,
            skip_factor,
            clock,
        }
    }

    pub fn skip_factor(&self) -> u64 {
        self.skip_factor
    }

    /// Play the whole source. The audio transport always receives its stop
    /// signal, whatever path ends the loop.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        renderer: &mut dyn GridRenderer,
        audio: &mut dyn AudioTransport,
        captions: Option<&mut CaptionTrack>,
        cancel: &CancelToken,
    ) -> Result<PlaybackStats> {
        audio.play()?;
        let start = self.clock.elapsed();

        let result = self.run_loop(source, renderer, captions, cancel, start);
        audio.stop();
        result
    }

    fn run_loop(
        &mut self,
        source: &mut dyn FrameSource,
        renderer: &mut dyn GridRenderer,
        mut captions: Option<&mut CaptionTrack>,
        cancel: &CancelToken,
        start: Duration,
    ) -> Result<PlaybackStats> {
        let total = self.opts.total_frames;
        let fps = self.opts.source_fps;
        let skip = self.skip_factor;
        let threshold = SKIP_THRESHOLD.as_secs_f64();

        let mut stats = PlaybackStats::default();
        let mut frames_in_second = 0u32;
        let mut fps_mark = start;
        let mut displayed_fps = 0.0f64;

        let mut index = 0u64;
        while index < total {
            if cancel.is_cancelled() {
                debug!("cancelled at frame {}", index);
                break;
            }

            // Wall-clock time at which this source frame should be showing.
            let ideal = index as f64 / fps;
            let actual = (self.clock.elapsed() - start).as_secs_f64();

            if !self.opts.disable_adaptive_skip && actual > ideal + threshold {
                index += skip;
                stats.skipped += 1;
                continue;
            }

            if actual < ideal {
                self.clock.sleep(Duration::from_secs_f64(ideal - actual));
            }

            let Some(frame) = source.frame_at(index)? else {
                // Same treatment as an adaptive skip: advance, no render.
                index += skip;
                stats.skipped += 1;
                continue;
            };
            renderer.paint_grid(&frame)?;

            if let Some(track) = captions.as_deref_mut() {
                let line = centered_line(
                    track.caption_at(index as f64 / fps).unwrap_or(""),
                    frame.cols() as usize,
                );
                renderer.paint_overlay(frame.rows(), 0, &line, None)?;
            }

            frames_in_second += 1;
            let now = self.clock.elapsed();
            if now - fps_mark >= Duration::from_secs(1) {
                displayed_fps = frames_in_second as f64 / (now - fps_mark).as_secs_f64();
                frames_in_second = 0;
                fps_mark = now;
            }
            if self.opts.debug_fps {
                let text = format!("FPS:{:.2}", displayed_fps);
                let col = (frame.cols() as usize).saturating_sub(text.len() + 1) as u16;
                renderer.paint_overlay(0, col, &text, self.opts.fps_paint)?;
            }

            renderer.present()?;
            stats.rendered += 1;
            index += skip;
        }

        Ok(stats)
    }
}

/// Center `text` in a full-width line so drawing it also clears the row.
fn centered_line(text: &str, cols: usize) -> String {
    let length = text.chars().count().min(cols);
    let pad = (cols - length) / 2;

    let mut line = String::with_capacity(cols);
    line.extend(std::iter::repeat(' ').take(pad));
    line.extend(text.chars().take(length));
    line.extend(std::iter::repeat(' ').take(cols - pad - length));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::playback::captions::CaptionCue;
    use crate::playback::clock::ManualClock;
    use crate::render::{GlyphCell, GlyphFrame};

    type SharedClock = Rc<RefCell<ManualClock>>;

    fn blank_frame(rows: u16, cols: u16) -> GlyphFrame {
        let cells = vec![
            GlyphCell {
                ch: ' ',
                paint: None
            };
            rows as usize * cols as usize
        ];
        GlyphFrame::from_cells(rows, cols, cells)
    }

    /// Frame source double: serves blank frames, records served indices,
    /// charges a simulated cost per fetch and can fail chosen indices.
    struct ScriptedSource {
        total: u64,
        served: Vec<u64>,
        cost: Duration,
        clock: SharedClock,
        fail_at: Vec<u64>,
        cancel_after: Option<(u64, CancelToken)>,
    }

    impl ScriptedSource {
        fn new(total: u64, clock: SharedClock) -> Self {
            Self {
                total,
                served: Vec::new(),
                cost: Duration::ZERO,
                clock,
                fail_at: Vec::new(),
                cancel_after: None,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn frame_at(&mut self, index: u64) -> Result<Option<GlyphFrame>> {
            self.clock.borrow_mut().advance(self.cost);
            if self.fail_at.contains(&index) {
                return Ok(None);
            }
            self.served.push(index);
            if let Some((after, token)) = &self.cancel_after {
                if self.served.len() as u64 >= *after {
                    token.cancel();
                }
            }
            Ok(Some(blank_frame(2, 10)))
        }

        fn count(&self) -> u64 {
            self.total
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        grids: u64,
        overlays: Vec<(u16, u16, String)>,
        presents: u64,
    }

    impl GridRenderer for RecordingRenderer {
        fn grid_size(&self) -> Result<(u16, u16)> {
            Ok((2, 10))
        }

        fn paint_grid(&mut self, _frame: &GlyphFrame) -> Result<()> {
            self.grids += 1;
            Ok(())
        }

        fn paint_overlay(
            &mut self,
            row: u16,
            col: u16,
            text: &str,
            _paint: Option<PaintHandle>,
        ) -> Result<()> {
            self.overlays.push((row, col, text.to_string()));
            Ok(())
        }

        fn present(&mut self) -> Result<()> {
            self.presents += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAudio {
        played: bool,
        stopped: bool,
    }

    impl AudioTransport for RecordingAudio {
        fn play(&mut self) -> Result<()> {
            self.played = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    fn options(total: u64, source_fps: f64) -> SchedulerOptions {
        SchedulerOptions {
            total_frames: total,
            source_fps,
            display_fps: None,
            disable_adaptive_skip: false,
            debug_fps: false,
            fps_paint: None,
        }
    }

    fn run_with(
        opts: SchedulerOptions,
        source: &mut ScriptedSource,
        clock: SharedClock,
    ) -> (PlaybackStats, RecordingRenderer, RecordingAudio) {
        let mut renderer = RecordingRenderer::default();
        let mut audio = RecordingAudio::default();
        let mut scheduler = PlaybackScheduler::new(opts, clock);
        let stats = scheduler
            .run(source, &mut renderer, &mut audio, None, &CancelToken::new())
            .unwrap();
        (stats, renderer, audio)
    }

    #[test]
    fn test_skip_factor_table() {
        assert_eq!(compute_skip_factor(30.0, Some(10.0)), 3);
        assert_eq!(compute_skip_factor(30.0, None), 1);
        assert_eq!(compute_skip_factor(30.0, Some(0.0)), 1);
        assert_eq!(compute_skip_factor(30.0, Some(-5.0)), 1);
        assert_eq!(compute_skip_factor(25.0, Some(25.0)), 1);
        assert_eq!(compute_skip_factor(30.0, Some(12.0)), 3);
        assert_eq!(compute_skip_factor(24.0, Some(60.0)), 1);
    }

    #[test]
    fn test_on_schedule_run_renders_every_frame() {
        let clock: SharedClock = Rc::default();
        let mut source = ScriptedSource::new(100, Rc::clone(&clock));

        let (stats, renderer, audio) = run_with(options(100, 25.0), &mut source, clock);

        assert_eq!(stats.rendered, 100);
        assert_eq!(stats.skipped, 0);
        assert_eq!(renderer.grids, 100);
        assert_eq!(source.served, (0..100).collect::<Vec<_>>());
        assert!(audio.played && audio.stopped);
    }

    #[test]
    fn test_lower_display_rate_strides_through_the_source() {
        for disable_adaptive_skip in [false, true] {
            let clock: SharedClock = Rc::default();
            let mut source = ScriptedSource::new(90, Rc::clone(&clock));
            let opts = SchedulerOptions {
                display_fps: Some(10.0),
                disable_adaptive_skip,
                ..options(90, 30.0)
            };

            let (stats, _, _) = run_with(opts, &mut source, clock);

            let expected: Vec<u64> = (0..90).step_by(3).collect();
            assert_eq!(source.served, expected);
            assert_eq!(stats.rendered, 30);
            assert_eq!(stats.skipped, 0);
        }
    }

    #[test]
    fn test_slow_rendering_triggers_catch_up_skips() {
        let clock: SharedClock = Rc::default();
        let mut source = ScriptedSource::new(10, Rc::clone(&clock));
        // Each fetch costs two frame periods at 10 fps.
        source.cost = Duration::from_millis(200);

        let (stats, _, _) = run_with(options(10, 10.0), &mut source, clock);

        assert_eq!(source.served, vec![0, 2, 4, 6, 8]);
        assert_eq!(stats.rendered, 5);
        assert_eq!(stats.skipped, 5);
        // Rendered indices are strictly increasing, never repeated.
        assert!(source.served.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_disabled_adaptive_skip_never_jumps() {
        let clock: SharedClock = Rc::default();
        let mut source = ScriptedSource::new(10, Rc::clone(&clock));
        source.cost = Duration::from_millis(200);
        let opts = SchedulerOptions {
            disable_adaptive_skip: true,
            ..options(10, 10.0)
        };

        let (stats, _, _) = run_with(opts, &mut source, clock);

        // Every index advances by exactly the skip factor, behind or not.
        assert_eq!(source.served, (0..10).collect::<Vec<_>>());
        assert_eq!(stats.rendered, 10);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn test_frame_failure_advances_like_a_skip() {
        let clock: SharedClock = Rc::default();
        let mut source = ScriptedSource::new(6, Rc::clone(&clock));
        source.fail_at = vec![3];

        let (stats, renderer, _) = run_with(options(6, 25.0), &mut source, clock);

        assert_eq!(source.served, vec![0, 1, 2, 4, 5]);
        assert_eq!(stats.rendered, 5);
        assert_eq!(stats.skipped, 1);
        assert_eq!(renderer.grids, 5);
    }

    #[test]
    fn test_cancellation_stops_rendering_and_audio() {
        let clock: SharedClock = Rc::default();
        let cancel = CancelToken::new();
        let mut source = ScriptedSource::new(100, Rc::clone(&clock));
        source.cancel_after = Some((3, cancel.clone()));

        let mut renderer = RecordingRenderer::default();
        let mut audio = RecordingAudio::default();
        let mut scheduler = PlaybackScheduler::new(options(100, 25.0), clock);
        let stats = scheduler
            .run(&mut source, &mut renderer, &mut audio, None, &cancel)
            .unwrap();

        // Nothing is rendered after the cancellation is observed, and the
        // transport still gets its stop signal.
        assert_eq!(stats.rendered, 3);
        assert_eq!(renderer.grids, 3);
        assert!(audio.stopped);
    }

    #[test]
    fn test_captions_are_painted_below_the_grid() {
        let clock: SharedClock = Rc::default();
        let mut source = ScriptedSource::new(2, Rc::clone(&clock));
        let mut track = CaptionTrack::new(vec![CaptionCue {
            start: 0.0,
            duration: 5.0,
            text: "hi".to_string(),
        }]);

        let mut renderer = RecordingRenderer::default();
        let mut audio = RecordingAudio::default();
        let mut scheduler = PlaybackScheduler::new(options(2, 25.0), clock);
        scheduler
            .run(
                &mut source,
                &mut renderer,
                &mut audio,
                Some(&mut track),
                &CancelToken::new(),
            )
            .unwrap();

        // Frames are 2x10, so captions land on row 2, centered and padded to
        // the full width.
        assert_eq!(renderer.overlays.len(), 2);
        let (row, col, text) = &renderer.overlays[0];
        assert_eq!((*row, *col), (2, 0));
        assert_eq!(text, "    hi    ");
    }

    #[test]
    fn test_debug_fps_overlay_is_drawn_top_right() {
        let clock: SharedClock = Rc::default();
        let mut source = ScriptedSource::new(1, Rc::clone(&clock));
        let opts = SchedulerOptions {
            debug_fps: true,
            ..options(1, 25.0)
        };

        let mut renderer = RecordingRenderer::default();
        let mut audio = RecordingAudio::default();
        let mut scheduler = PlaybackScheduler::new(opts, clock);
        scheduler
            .run(
                &mut source,
                &mut renderer,
                &mut audio,
                None,
                &CancelToken::new(),
            )
            .unwrap();

        let (row, _, text) = &renderer.overlays[0];
        assert_eq!(*row, 0);
        assert!(text.starts_with("FPS:"));
    }

    #[test]
    fn test_centered_line_clears_the_full_width() {
        assert_eq!(centered_line("abc", 7), "  abc  ");
        assert_eq!(centered_line("", 3), "   ");
        assert_eq!(centered_line("toolongtext", 4), "tool");
    }
}
