use std::path::Path;

use ffmpeg_next as ffmpeg;
use image::ImageBuffer;
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::video::types::Frame;
use crate::video::{VideoDecoder, VideoMetadata};

const EAGAIN: i32 = 11;

/// FFmpeg-backed decoder for container formats (mp4, mkv, webm, ...).
///
/// Reads are index-addressed: sequential requests keep draining the demuxer,
/// anything else seeks to the nearest keyframe first and decodes forward until
/// the target timestamp.
pub struct FfmpegDecoder {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg::Rational,
    meta: VideoMetadata,
    next_index: u64,
}

impl FfmpegDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().map_err(|e| SourceError::OpenFailed {
            path: format!("ffmpeg init: {}", e),
        })?;

        let ictx = ffmpeg::format::input(&path).map_err(|_| SourceError::OpenFailed {
            path: path.display().to_string(),
        })?;

        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| SourceError::OpenFailed {
                path: format!("no video stream in {}", path.display()),
            })?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let frame_rate: f64 = stream.rate().into();

        // Prefer the container's frame count; fall back to duration * rate.
        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else {
            let duration = ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE);
            (duration.max(0.0) * frame_rate).round() as u64
        };

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| SourceError::OpenFailed {
                path: format!("{}: {}", path.display(), e),
            })?;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| SourceError::OpenFailed {
            path: format!("scaler: {}", e),
        })?;

        info!(
            "Opened {:?}: {:.2} fps, {} frames, {}x{}",
            path,
            frame_rate,
            frame_count,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            meta: VideoMetadata {
                frame_rate,
                frame_count,
            },
            next_index: 0,
        })
    }

    /// Stream timestamp of a frame index.
    fn pts_for(&self, index: u64) -> i64 {
        let seconds = index as f64 / self.meta.frame_rate;
        (seconds / f64::from(self.time_base)).round() as i64
    }

    /// Drain decoded frames until one at or past `target_pts` comes out.
    /// `Ok(None)` means the decoder wants more input (or hit end of stream).
    fn try_receive(&mut self, target_pts: i64) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    if decoded.pts().unwrap_or(target_pts) < target_pts {
                        continue;
                    }
                    let mut rgb = ffmpeg::frame::Video::empty();
                    self.scaler.run(&decoded, &mut rgb).map_err(|e| {
                        SourceError::DecodeFailed {
                            reason: format!("scaling: {}", e),
                        }
                    })?;
                    return Ok(Some(frame_from_rgb(&rgb)?));
                }
                Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => return Ok(None),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(e) => {
                    return Err(SourceError::DecodeFailed {
                        reason: e.to_string(),
                    }
                    .into())
                }
            }
        }
    }

    /// Feed one packet of the video stream; false when the demuxer is drained.
    fn feed_packet(&mut self) -> Result<bool> {
        let stream_index = self.stream_index;
        for (stream, packet) in self.ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| SourceError::DecodeFailed {
                    reason: format!("send packet: {}", e),
                })?;
            return Ok(true);
        }
        Ok(false)
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn metadata(&self) -> &VideoMetadata {
        &self.meta
    }

    fn seek_and_read(&mut self, index: u64) -> Result<Option<Frame>> {
        if self.meta.frame_count > 0 && index >= self.meta.frame_count {
            return Ok(None);
        }

        if index != self.next_index {
            debug!("seeking from frame {} to {}", self.next_index, index);
            let seconds = index as f64 / self.meta.frame_rate;
            let ts = (seconds * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
            self.ictx
                .seek(ts, ..ts)
                .map_err(|e| SourceError::DecodeFailed {
                    reason: format!("seek to frame {}: {}", index, e),
                })?;
            self.decoder.flush();
        }

        let target_pts = self.pts_for(index);
        loop {
            if let Some(frame) = self.try_receive(target_pts)? {
                self.next_index = index + 1;
                return Ok(Some(frame));
            }
            if !self.feed_packet()? {
                // Demuxer exhausted: flush the decoder, then report end of stream.
                let _ = self.decoder.send_eof();
                if let Some(frame) = self.try_receive(target_pts)? {
                    self.next_index = index + 1;
                    return Ok(Some(frame));
                }
                return Ok(None);
            }
        }
    }
}

/// Copy an RGB24 frame row by row; the scaler output may carry row padding.
fn frame_from_rgb(rgb: &ffmpeg::frame::Video) -> Result<Frame> {
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    let stride = rgb.stride(0);
    let src = rgb.data(0);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let offset = y * stride;
        data.extend_from_slice(&src[offset..offset + width * 3]);
    }

    let buffer = ImageBuffer::from_raw(rgb.width(), rgb.height(), data).ok_or_else(|| {
        SourceError::DecodeFailed {
            reason: "rgb frame buffer has unexpected size".to_string(),
        }
    })?;
    Ok(Frame::new(buffer))
}
