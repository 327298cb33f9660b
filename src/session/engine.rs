use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, info};

use crate::{
    audio::{AudioTransport, NullTransport, RodioTransport},
    config::{Config, SourceStrategy},
    error::{RenderError, Result},
    playback::{
        CancelToken, CaptionTrack, PlaybackScheduler, PlaybackStats, SchedulerOptions, SystemClock,
    },
    render::{
        ColorQuantizer, FrameTranscoder, GridRenderer, PaintCache, PaintHandle, PalettePolicy,
        TerminalRenderer,
    },
    source::{CacheManifest, DiskFrameSource, FrameSource, LiveFrameSource, MemoryFrameSource},
    video::{ImageSequenceDecoder, VideoDecoder, VideoMetadata},
};

/// Per-invocation inputs that are not part of the persistent configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Video file (with the `ffmpeg` feature) or directory of frame images.
    pub input: PathBuf,
    /// Audio track override; defaults to the input when it is a file.
    pub audio: Option<PathBuf>,
    /// Transcript file with caption cues.
    pub captions: Option<PathBuf>,
    /// Reuse the resized frame cache from a previous run (disk strategy).
    pub reuse_cache: bool,
}

/// Main playback engine that wires the whole pipeline together
///
/// The engine follows a clear pipeline:
/// 1. Source Acquisition - open the decoder and validate its metadata
/// 2. Terminal Setup - raw mode, grid size, paint cache
/// 3. Frame Supply - build the configured frame source
/// 4. Audio - load the transport the timing model is anchored to
/// 5. Playback - run the adaptive scheduler until done or interrupted
pub struct PlaybackEngine {
    config: Config,
}

impl PlaybackEngine {
    /// Create a new playback engine with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Play one input to completion (or cancellation) and report stats.
    pub fn play(&self, opts: &SessionOptions, cancel: CancelToken) -> Result<PlaybackStats> {
        info!("🎞️  Starting glyph playback session");
        info!("   Input: {:?}", opts.input);

        // Pipeline Step 1: Source Acquisition
        let decoder = self.open_decoder(opts)?;
        let meta = decoder.metadata().clone();
        meta.validate()?;
        info!(
            "   Source: {:.2} fps, {} frames",
            meta.frame_rate, meta.frame_count
        );

        let mut captions = match &opts.captions {
            Some(path) => {
                let track = CaptionTrack::load(path)?;
                info!("   Captions: {} cues", track.len());
                Some(track)
            }
            None => None,
        };

        // Pipeline Step 2: Terminal Setup
        let paints = PaintCache::shared(self.config.render.max_paints);
        let mut renderer = TerminalRenderer::new(Rc::clone(&paints))?;
        let (term_rows, term_cols) = renderer.grid_size()?;
        if term_rows < 2 || term_cols < 2 {
            return Err(RenderError::GridTooSmall {
                rows: term_rows,
                cols: term_cols,
            }
            .into());
        }
        // Captions get the bottom terminal row; the grid keeps the rest.
        let grid_rows = if captions.is_some() {
            term_rows - 1
        } else {
            term_rows
        };
        debug!("terminal grid {}x{}", grid_rows, term_cols);

        let policy = self
            .config
            .render
            .color
            .policy()
            .unwrap_or(PalettePolicy::Extended);
        let mut quantizer = ColorQuantizer::new(policy, paints);
        let transcoder = FrameTranscoder::new(grid_rows, term_cols, self.config.render.color);
        let fps_paint = self.debug_paint(&mut quantizer);

        // Pipeline Step 3: Frame Supply
        let mut source = self.build_source(decoder, opts, &meta, transcoder, quantizer)?;
        info!("   Frames ready: {}", source.count());

        // Pipeline Step 4: Audio
        let mut audio = self.load_audio(opts)?;

        // Pipeline Step 5: Playback
        let scheduler_opts = SchedulerOptions {
            total_frames: source.count(),
            source_fps: meta.frame_rate,
            display_fps: self.config.playback.display_fps,
            disable_adaptive_skip: self.config.playback.disable_adaptive_skip,
            debug_fps: self.config.playback.debug_fps,
            fps_paint,
        };
        let mut scheduler = PlaybackScheduler::new(scheduler_opts, SystemClock::new());
        debug!("skip factor {}", scheduler.skip_factor());

        let stats = scheduler.run(
            source.as_mut(),
            &mut renderer,
            audio.as_mut(),
            captions.as_mut(),
            &cancel,
        )?;

        // Leave the alternate screen before the closing log lines.
        drop(renderer);

        if cancel.is_cancelled() {
            info!(
                "Playback interrupted: {} frames rendered, {} skipped",
                stats.rendered, stats.skipped
            );
        } else {
            info!(
                "🎉 Playback complete: {} frames rendered, {} skipped",
                stats.rendered, stats.skipped
            );
        }
        Ok(stats)
    }

    fn open_decoder(&self, opts: &SessionOptions) -> Result<Box<dyn VideoDecoder>> {
        if opts.input.is_dir() {
            let decoder =
                ImageSequenceDecoder::open(&opts.input, self.config.source.sequence_fps)?;
            return Ok(Box::new(decoder));
        }

        #[cfg(feature = "ffmpeg")]
        {
            Ok(Box::new(crate::video::FfmpegDecoder::open(&opts.input)?))
        }
        #[cfg(not(feature = "ffmpeg"))]
        {
            Err(crate::error::SourceError::UnsupportedFormat {
                format: format!(
                    "{}: container decode requires the `ffmpeg` feature; pass a directory of frame images instead",
                    opts.input.display()
                ),
            }
            .into())
        }
    }

    fn build_source(
        &self,
        mut decoder: Box<dyn VideoDecoder>,
        opts: &SessionOptions,
        meta: &VideoMetadata,
        transcoder: FrameTranscoder,
        mut quantizer: ColorQuantizer,
    ) -> Result<Box<dyn FrameSource>> {
        match self.config.source.strategy {
            SourceStrategy::Memory => {
                let source =
                    MemoryFrameSource::build(decoder.as_mut(), &transcoder, &mut quantizer)?;
                // Decoder dropped here; in-memory playback never reads it again.
                Ok(Box::new(source))
            }
            SourceStrategy::Disk => {
                let dir = &self.config.source.cache_dir;
                let manifest = CacheManifest {
                    input: opts.input.display().to_string(),
                    source_fps: meta.frame_rate,
                    display_fps: self.config.playback.display_fps,
                    frame_count: meta.frame_count,
                };
                let source = if opts.reuse_cache {
                    DiskFrameSource::open(dir, &manifest, transcoder, quantizer)?
                } else {
                    DiskFrameSource::build(decoder.as_mut(), dir, manifest, transcoder, quantizer)?
                };
                Ok(Box::new(source))
            }
            SourceStrategy::Live => {
                Ok(Box::new(LiveFrameSource::new(decoder, transcoder, quantizer)))
            }
        }
    }

    fn load_audio(&self, opts: &SessionOptions) -> Result<Box<dyn AudioTransport>> {
        if !self.config.audio.enabled {
            info!("   Audio: disabled");
            return Ok(Box::new(NullTransport));
        }

        let path = opts
            .audio
            .clone()
            .or_else(|| opts.input.is_file().then(|| opts.input.clone()));

        match path {
            Some(path) => {
                info!("   Audio: {:?}", path);
                Ok(Box::new(RodioTransport::load(&path)?))
            }
            None => {
                info!("   Audio: no track (directory input, none supplied)");
                Ok(Box::new(NullTransport))
            }
        }
    }

    /// Green paint for the FPS counter, allocated once up front.
    fn debug_paint(&self, quantizer: &mut ColorQuantizer) -> Option<PaintHandle> {
        if !self.config.playback.debug_fps {
            return None;
        }
        let key = quantizer.quantize(0, 255, 0);
        Some(quantizer.paint_handle_for(key, None))
    }
}
