use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::video::types::Frame;
use crate::video::{VideoDecoder, VideoMetadata};

/// Decoder over a directory of numbered frame images.
///
/// Files are ordered by the trailing number in their stem (`frame0.png`,
/// `frame1.png`, ...), falling back to name order for unnumbered files. The
/// frame rate cannot be derived from still images, so the caller supplies it.
pub struct ImageSequenceDecoder {
    frames: Vec<PathBuf>,
    meta: VideoMetadata,
}

impl ImageSequenceDecoder {
    pub fn open(dir: &Path, frame_rate: f64) -> Result<Self> {
        if !dir.is_dir() {
            return Err(SourceError::OpenFailed {
                path: dir.display().to_string(),
            }
            .into());
        }

        let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image_file(path))
            .collect();

        if frames.is_empty() {
            return Err(SourceError::OpenFailed {
                path: format!("no frame images found in {}", dir.display()),
            }
            .into());
        }

        frames.sort_by_key(|path| {
            (
                numeric_suffix(path).unwrap_or(u64::MAX),
                path.file_name().map(|n| n.to_os_string()),
            )
        });

        let meta = VideoMetadata {
            frame_rate,
            frame_count: frames.len() as u64,
        };
        info!(
            "Opened image sequence: {} frames at {:.2} fps",
            meta.frame_count, meta.frame_rate
        );

        Ok(Self { frames, meta })
    }
}

impl VideoDecoder for ImageSequenceDecoder {
    fn metadata(&self) -> &VideoMetadata {
        &self.meta
    }

    fn seek_and_read(&mut self, index: u64) -> Result<Option<Frame>> {
        let Some(path) = self.frames.get(index as usize) else {
            return Ok(None);
        };

        debug!("decoding frame {} from {:?}", index, path);
        let image = image::open(path).map_err(|e| SourceError::DecodeFailed {
            reason: format!("{}: {}", path.display(), e),
        })?;

        Ok(Some(Frame::new(image.to_rgb8())))
    }
}

fn is_image_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg"),
        None => false,
    }
}

/// Trailing digit run of the file stem, if any.
fn numeric_suffix(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits: Vec<char> = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.iter().rev().collect::<String>().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    fn write_frame(dir: &Path, name: &str, level: u8) {
        let image = RgbImage::from_pixel(2, 2, image::Rgb([level, level, level]));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_frames_are_ordered_numerically() {
        let dir = tempdir().unwrap();
        // Named so lexicographic order would be wrong: 10 < 2 as strings.
        write_frame(dir.path(), "frame10.png", 10);
        write_frame(dir.path(), "frame2.png", 2);
        write_frame(dir.path(), "frame1.png", 1);

        let mut decoder = ImageSequenceDecoder::open(dir.path(), 24.0).unwrap();
        assert_eq!(decoder.metadata().frame_count, 3);
        assert_eq!(decoder.metadata().frame_rate, 24.0);

        let first = decoder.seek_and_read(0).unwrap().unwrap();
        assert_eq!(first.as_image().get_pixel(0, 0).0, [1, 1, 1]);
        let last = decoder.seek_and_read(2).unwrap().unwrap();
        assert_eq!(last.as_image().get_pixel(0, 0).0, [10, 10, 10]);
    }

    #[test]
    fn test_read_past_the_end_signals_end_of_stream() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), "frame0.png", 0);

        let mut decoder = ImageSequenceDecoder::open(dir.path(), 24.0).unwrap();
        assert!(decoder.seek_and_read(5).unwrap().is_none());
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let dir = tempdir().unwrap();
        assert!(ImageSequenceDecoder::open(dir.path(), 24.0).is_err());
    }

    #[test]
    fn test_numeric_suffix_extraction() {
        assert_eq!(numeric_suffix(Path::new("frame042.png")), Some(42));
        assert_eq!(numeric_suffix(Path::new("shot_7.jpg")), Some(7));
        assert_eq!(numeric_suffix(Path::new("cover.png")), None);
    }
}
