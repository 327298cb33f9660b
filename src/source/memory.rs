use tracing::{debug, info, warn};

use crate::error::Result;
use crate::render::{ColorQuantizer, FrameTranscoder, GlyphFrame};
use crate::source::FrameSource;
use crate::video::VideoDecoder;

/// Frames fully transcoded during a setup phase and held in memory.
///
/// The build is a streaming single pass: each raw decoded frame is dropped
/// immediately after transcoding, bounding peak memory to one raw frame plus
/// the accumulated glyph output. After the build the decoder is no longer
/// needed and can be dropped.
pub struct MemoryFrameSource {
    frames: Vec<GlyphFrame>,
}

impl MemoryFrameSource {
    pub fn build(
        decoder: &mut dyn VideoDecoder,
        transcoder: &FrameTranscoder,
        quantizer: &mut ColorQuantizer,
    ) -> Result<Self> {
        let expected = decoder.metadata().frame_count;
        let mut frames = Vec::with_capacity(expected as usize);

        info!("Precomputing glyph frames for {} source frames...", expected);
        for index in 0..expected {
            let Some(raw) = decoder.seek_and_read(index)? else {
                warn!("source ended early at frame {} of {}", index, expected);
                break;
            };
            frames.push(transcoder.transcode(&raw, quantizer));
            if index % 250 == 0 {
                debug!("transcoded frame {}/{}", index, expected);
            }
        }

        info!("Precomputed {} glyph frames", frames.len());
        Ok(Self { frames })
    }
}

impl FrameSource for MemoryFrameSource {
    fn frame_at(&mut self, index: u64) -> Result<Option<GlyphFrame>> {
        Ok(self.frames.get(index as usize).cloned())
    }

    fn count(&self) -> u64 {
        self.frames.len() as u64
    }
}
