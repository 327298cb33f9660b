use tracing::warn;

use crate::error::Result;
use crate::render::{ColorQuantizer, FrameTranscoder, GlyphFrame};
use crate::source::FrameSource;
use crate::video::VideoDecoder;

/// Seek-decode-transcode interleaved with playback.
///
/// Owns the decode session for its whole lifetime; dropping the source (on
/// completion or cancellation) releases the decoder handle. Because the
/// scheduler may skip ahead, requests are not sequential and every call seeks.
pub struct LiveFrameSource {
    decoder: Box<dyn VideoDecoder>,
    transcoder: FrameTranscoder,
    quantizer: ColorQuantizer,
    count: u64,
}

impl LiveFrameSource {
    pub fn new(
        decoder: Box<dyn VideoDecoder>,
        transcoder: FrameTranscoder,
        quantizer: ColorQuantizer,
    ) -> Self {
        let count = decoder.metadata().frame_count;
        Self {
            decoder,
            transcoder,
            quantizer,
            count,
        }
    }
}

impl FrameSource for LiveFrameSource {
    fn frame_at(&mut self, index: u64) -> Result<Option<GlyphFrame>> {
        match self.decoder.seek_and_read(index) {
            Ok(Some(raw)) => Ok(Some(self.transcoder.transcode(&raw, &mut self.quantizer))),
            Ok(None) => Ok(None),
            Err(e) => {
                // Transient decode failure: recovered locally by the skip
                // policy, never surfaced as a session error.
                warn!("live decode failed at frame {}: {}", index, e);
                Ok(None)
            }
        }
    }

    fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::render::{ColorMode, PaintCache, PalettePolicy};
    use crate::video::types::Frame;
    use crate::video::VideoMetadata;

    /// Decoder stub failing on one index and ending early on another.
    struct FlakyDecoder {
        meta: VideoMetadata,
        fail_at: u64,
    }

    impl VideoDecoder for FlakyDecoder {
        fn metadata(&self) -> &VideoMetadata {
            &self.meta
        }

        fn seek_and_read(&mut self, index: u64) -> Result<Option<Frame>> {
            if index >= self.meta.frame_count {
                return Ok(None);
            }
            if index == self.fail_at {
                return Err(SourceError::DecodeFailed {
                    reason: "corrupt frame".to_string(),
                }
                .into());
            }
            Ok(Some(Frame::new_filled(5, 5, [60, 60, 60])))
        }
    }

    fn live_source(frame_count: u64, fail_at: u64) -> LiveFrameSource {
        let decoder = FlakyDecoder {
            meta: VideoMetadata {
                frame_rate: 25.0,
                frame_count,
            },
            fail_at,
        };
        LiveFrameSource::new(
            Box::new(decoder),
            FrameTranscoder::new(2, 4, ColorMode::Mono),
            ColorQuantizer::new(PalettePolicy::Extended, PaintCache::shared(256)),
        )
    }

    #[test]
    fn test_decode_failure_becomes_a_skip_signal() {
        let mut source = live_source(5, 2);
        assert!(source.frame_at(0).unwrap().is_some());
        assert!(source.frame_at(2).unwrap().is_none());
        // Later indices still decode after a failed one.
        assert!(source.frame_at(3).unwrap().is_some());
    }

    #[test]
    fn test_end_of_stream_is_a_skip_signal() {
        let mut source = live_source(3, 99);
        assert_eq!(source.count(), 3);
        assert!(source.frame_at(3).unwrap().is_none());
    }

    #[test]
    fn test_non_sequential_reads_are_supported() {
        let mut source = live_source(10, 99);
        assert!(source.frame_at(7).unwrap().is_some());
        assert!(source.frame_at(1).unwrap().is_some());
        assert!(source.frame_at(9).unwrap().is_some());
    }
}
