use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};

use glyph_projector::{
    config::{Config, SourceStrategy},
    playback::CancelToken,
    render::ColorMode,
    session::{PlaybackEngine, SessionOptions},
};

#[derive(Parser)]
#[command(
    name = "glyph-projector",
    version,
    about = "Play videos as glyph-grid animations in your terminal",
    long_about = "Glyph-Projector renders a video as character-grid frames in the terminal while \
                  the audio track plays at normal speed. When a lower display rate is requested or \
                  rendering falls behind, frames are skipped rather than slowed so the picture \
                  stays in sync with the sound."
)]
struct Cli {
    /// Video file (with the ffmpeg feature) or directory of numbered frame images
    input: PathBuf,

    /// Display framerate; fewer frames are shown but audio speed is unchanged
    #[arg(short, long)]
    fps: Option<f64>,

    /// Frame supply strategy (memory, disk, live)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Reuse cached resized frames from a previous run (disk strategy)
    #[arg(short = 'c', long)]
    cached: bool,

    /// Cell coloring (mono, extended, basic)
    #[arg(long)]
    color: Option<String>,

    /// Transcript file with caption cues (JSON)
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Audio track to play; defaults to the input when it is a video file
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Disable dynamic skipping; if rendering falls behind, video may desync
    #[arg(long)]
    no_skip: bool,

    /// Show live FPS (frames drawn per second) in the top-right corner
    #[arg(long)]
    debug_fps: bool,

    /// Play silently
    #[arg(long)]
    no_audio: bool,

    /// Configuration file (optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout belongs to the raw-mode playback screen.
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Glyph-Projector v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration, then let command-line flags override it.
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };

    if let Some(fps) = cli.fps {
        config.playback.display_fps = Some(fps);
    }
    if let Some(strategy) = &cli.strategy {
        config.source.strategy = strategy.parse::<SourceStrategy>()?;
    }
    if let Some(color) = &cli.color {
        config.render.color = color.parse::<ColorMode>()?;
    }
    if cli.no_skip {
        config.playback.disable_adaptive_skip = true;
    }
    if cli.debug_fps {
        config.playback.debug_fps = true;
    }
    if cli.no_audio {
        config.audio.enabled = false;
    }
    config.validate()?;

    let options = SessionOptions {
        input: cli.input,
        audio: cli.audio,
        captions: cli.subtitles,
        reuse_cache: cli.cached,
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())?;
    }

    let engine = PlaybackEngine::new(config);
    match engine.play(&options, cancel) {
        Ok(stats) => {
            info!(
                "Done: {} frames rendered, {} skipped",
                stats.rendered, stats.skipped
            );
            Ok(())
        }
        Err(err) => {
            error!("{}", err.user_message());
            Err(err.into())
        }
    }
}
