use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SourceError};
use crate::render::{ColorQuantizer, FrameTranscoder, GlyphFrame};
use crate::source::FrameSource;
use crate::video::VideoDecoder;

const MANIFEST_FILE: &str = "manifest.toml";

/// Metadata record stored alongside the resized frame images, used to decide
/// whether a cache from a previous session matches the current request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Identifier of the input the cache was built from.
    pub input: String,
    /// Frame rate of the original video.
    pub source_fps: f64,
    /// Display rate requested when the cache was built.
    pub display_fps: Option<f64>,
    /// Number of cached frames.
    pub frame_count: u64,
}

impl CacheManifest {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| SourceError::CacheMetadata {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let manifest = toml::from_str(&content).map_err(|e| SourceError::CacheMetadata {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(manifest)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SourceError::CacheMetadata {
            path: dir.join(MANIFEST_FILE).display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// Human-readable differences between this manifest and the current
    /// request. Mismatches are reported as warnings, never hard failures.
    pub fn mismatches(&self, expected: &CacheManifest) -> Vec<String> {
        let mut found = Vec::new();
        if self.input != expected.input {
            found.push(format!(
                "cache was built from '{}', not '{}'",
                self.input, expected.input
            ));
        }
        if self.source_fps != expected.source_fps {
            found.push(format!(
                "cached frame rate {} differs from source {}",
                self.source_fps, expected.source_fps
            ));
        }
        if self.display_fps != expected.display_fps {
            found.push(format!(
                "cached display rate {:?} differs from requested {:?}",
                self.display_fps, expected.display_fps
            ));
        }
        if self.frame_count != expected.frame_count {
            found.push(format!(
                "cache holds {} frames, source reports {}",
                self.frame_count, expected.frame_count
            ));
        }
        found
    }
}

fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("frame{:06}.png", index))
}

/// Frames kept as pre-resized images on storage, glyph-mapped on demand.
///
/// No caching between calls: the re-decode cost is paid per display, which is
/// acceptable since the resize was already amortized at build time.
pub struct DiskFrameSource {
    dir: PathBuf,
    count: u64,
    transcoder: FrameTranscoder,
    quantizer: ColorQuantizer,
}

impl DiskFrameSource {
    /// Stream the decoder to disk: resize each frame to the grid and store it,
    /// then write the manifest for later reuse checks.
    pub fn build(
        decoder: &mut dyn VideoDecoder,
        dir: &Path,
        manifest: CacheManifest,
        transcoder: FrameTranscoder,
        quantizer: ColorQuantizer,
    ) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let (rows, cols) = transcoder.grid();
        let expected = decoder.metadata().frame_count;

        info!("Resizing {} frames into cache at {:?}...", expected, dir);
        let mut count = 0u64;
        for index in 0..expected {
            let Some(raw) = decoder.seek_and_read(index)? else {
                warn!("source ended early at frame {} of {}", index, expected);
                break;
            };
            let resized = imageops::resize(
                raw.as_image(),
                cols as u32,
                rows as u32,
                FilterType::Nearest,
            );
            let path = frame_path(dir, index);
            resized.save(&path).map_err(|_| SourceError::CacheWriteFailed {
                path: path.display().to_string(),
            })?;
            count += 1;
            if index % 250 == 0 {
                debug!("cached frame {}/{}", index, expected);
            }
        }

        let manifest = CacheManifest {
            frame_count: count,
            ..manifest
        };
        manifest.save(dir)?;
        info!("Cached {} resized frames", count);

        Ok(Self {
            dir: dir.to_path_buf(),
            count,
            transcoder,
            quantizer,
        })
    }

    /// Reuse a cache built by a previous session.
    ///
    /// Manifest mismatches (or an unreadable manifest) are warnings; playback
    /// proceeds, possibly desynchronized, at the user's risk.
    pub fn open(
        dir: &Path,
        expected: &CacheManifest,
        transcoder: FrameTranscoder,
        quantizer: ColorQuantizer,
    ) -> Result<Self> {
        let count = match CacheManifest::load(dir) {
            Ok(found) => {
                for mismatch in found.mismatches(expected) {
                    warn!("{}; playback may drift", mismatch);
                }
                found.frame_count
            }
            Err(e) => {
                warn!("{}; counting frames on disk instead", e);
                count_cached_frames(dir)?
            }
        };

        if count == 0 {
            return Err(SourceError::OpenFailed {
                path: format!("no cached frames in {}", dir.display()),
            }
            .into());
        }

        info!("Reusing {} cached frames from {:?}", count, dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            count,
            transcoder,
            quantizer,
        })
    }
}

impl FrameSource for DiskFrameSource {
    fn frame_at(&mut self, index: u64) -> Result<Option<GlyphFrame>> {
        if index >= self.count {
            return Ok(None);
        }

        let path = frame_path(&self.dir, index);
        let image = match image::open(&path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                // Transient hot-path failure: skip, never abort the session.
                warn!("failed to decode cached frame {:?}: {}", path, e);
                return Ok(None);
            }
        };

        Ok(Some(
            self.transcoder
                .transcode_preresized(&image, &mut self.quantizer),
        ))
    }

    fn count(&self) -> u64 {
        self.count
    }
}

fn count_cached_frames(dir: &Path) -> Result<u64> {
    let mut count = 0u64;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("frame") && name.ends_with(".png") {
            count += 1;
        }
    }
    Ok(count)
}
