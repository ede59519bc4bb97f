//! `tokio_util::codec` adapter for async links.
//!
//! Uses the same extraction routine as [`StreamDecoder`](crate::StreamDecoder),
//! so `FramedRead`/`FramedWrite` over a tokio serial or socket stream behave
//! exactly like the blocking reader.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame};
use crate::decoder::{extract_frame, log_event, DecodeEvent, DecoderConfig, DecoderStats};
use crate::error::FrameError;

/// Frame codec for `tokio_util::codec::Framed`.
#[derive(Debug, Default)]
pub struct DxCodec {
    config: DecoderConfig,
    stats: DecoderStats,
}

impl DxCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            stats: DecoderStats::default(),
        }
    }

    /// Decoder counters accumulated so far.
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }
}

impl Decoder for DxCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let stats = &mut self.stats;
        let frame = extract_frame(src, self.config.garbage_threshold, &mut |event: DecodeEvent| {
            stats.record(&event);
            log_event(&event);
        });
        if frame.is_some() {
            self.stats.frames += 1;
        }
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A truncated tail at end of stream is noise, not an error.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for DxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.cmd(), item.payload(), dst)
    }
}
