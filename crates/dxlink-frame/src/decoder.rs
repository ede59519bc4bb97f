//! Stream decoder: raw link bytes in, validated frames out.
//!
//! The decoder owns one buffer and walks it with a length-directed scan:
//! find the header, wait until `7 + length` bytes are buffered, then cut
//! exactly that many bytes as a candidate. The candidate is removed whether
//! or not it verifies, so every pass makes progress and total work stays
//! linear in the bytes fed.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::checksum::checksum;
use crate::codec::{Frame, FOOTER, HEADER, MIN_FRAME_LEN};
use crate::hex::to_hex;

/// Header-less bytes tolerated before the buffer is presumed noise.
pub const DEFAULT_GARBAGE_THRESHOLD: usize = 100;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Configuration for [`StreamDecoder`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Once more than this many bytes are buffered without a header in
    /// sight, the whole buffer is dropped. Default: 100.
    pub garbage_threshold: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            garbage_threshold: DEFAULT_GARBAGE_THRESHOLD,
        }
    }
}

/// A candidate frame that was cut from the stream but failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorruptFrame {
    /// The last two bytes were not `58 44`.
    #[error("footer mismatch in {}", to_hex(.candidate))]
    FooterMismatch { candidate: Bytes },

    /// The transmitted checksum disagrees with the recomputed one.
    #[error("checksum mismatch (received {received:02X}, computed {computed:02X})")]
    ChecksumMismatch {
        candidate: Bytes,
        received: u8,
        computed: u8,
    },
}

impl CorruptFrame {
    /// The discarded candidate bytes.
    pub fn candidate(&self) -> &Bytes {
        match self {
            CorruptFrame::FooterMismatch { candidate }
            | CorruptFrame::ChecksumMismatch { candidate, .. } => candidate,
        }
    }
}

/// Non-fatal diagnostics produced while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// Bytes in front of a header were dropped as noise.
    Discarded { bytes: Bytes },
    /// The buffer held more than the garbage threshold with no header and
    /// was cleared.
    Flushed { len: usize },
    /// A length-delimited candidate failed its footer or checksum check.
    Corrupt(CorruptFrame),
}

/// Running counters kept by a decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames: u64,
    pub discarded_bytes: u64,
    pub flushes: u64,
    pub footer_mismatches: u64,
    pub checksum_mismatches: u64,
}

impl DecoderStats {
    /// Total candidates rejected for either reason.
    pub fn corrupt(&self) -> u64 {
        self.footer_mismatches + self.checksum_mismatches
    }

    pub(crate) fn record(&mut self, event: &DecodeEvent) {
        match event {
            DecodeEvent::Discarded { bytes } => self.discarded_bytes += bytes.len() as u64,
            DecodeEvent::Flushed { len } => {
                self.flushes += 1;
                self.discarded_bytes += *len as u64;
            }
            DecodeEvent::Corrupt(CorruptFrame::FooterMismatch { candidate }) => {
                self.footer_mismatches += 1;
                self.discarded_bytes += candidate.len() as u64;
            }
            DecodeEvent::Corrupt(CorruptFrame::ChecksumMismatch { candidate, .. }) => {
                self.checksum_mismatches += 1;
                self.discarded_bytes += candidate.len() as u64;
            }
        }
    }
}

/// Stateful decoder turning a raw byte stream into validated frames.
///
/// Each instance exclusively owns its buffer; feed it from one thread only.
#[derive(Debug)]
pub struct StreamDecoder {
    buf: BytesMut,
    config: DecoderConfig,
    stats: DecoderStats,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stats: DecoderStats::default(),
        }
    }

    /// Append `bytes` and return every frame that can now be extracted, in
    /// arrival order.
    ///
    /// Partial frames stay buffered for the next call. Noise and corrupt
    /// candidates are dropped, counted, and logged.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.feed_with(bytes, |_| {})
    }

    /// Like [`feed`](Self::feed), also handing each diagnostic to `on_event`.
    pub fn feed_with<F>(&mut self, bytes: &[u8], mut on_event: F) -> Vec<Frame>
    where
        F: FnMut(&DecodeEvent),
    {
        self.buf.extend_from_slice(bytes);

        let threshold = self.config.garbage_threshold;
        let stats = &mut self.stats;
        let mut sink = |event: DecodeEvent| {
            stats.record(&event);
            log_event(&event);
            on_event(&event);
        };

        let mut frames = Vec::new();
        while let Some(frame) = extract_frame(&mut self.buf, threshold, &mut sink) {
            trace!(cmd = frame.cmd(), len = frame.length(), "frame decoded");
            frames.push(frame);
        }

        self.stats.frames += frames.len() as u64;
        frames
    }

    /// Bytes buffered but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Counters accumulated since creation.
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Drop any buffered bytes (e.g. before reusing the decoder on a new link).
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

/// Extract the next valid frame from `buf`, consuming garbage and corrupt
/// candidates on the way.
///
/// Returns `None` when the buffer holds no complete frame yet. Bytes of a
/// partial frame are left in place.
pub(crate) fn extract_frame(
    buf: &mut BytesMut,
    garbage_threshold: usize,
    sink: &mut dyn FnMut(DecodeEvent),
) -> Option<Frame> {
    loop {
        let Some(start) = find_header(buf) else {
            if buf.len() > garbage_threshold {
                let len = buf.len();
                buf.clear();
                sink(DecodeEvent::Flushed { len });
            }
            return None;
        };

        if start > 0 {
            let bytes = buf.split_to(start).freeze();
            sink(DecodeEvent::Discarded { bytes });
        }

        if buf.len() < MIN_FRAME_LEN {
            return None;
        }

        let total = MIN_FRAME_LEN + buf[3] as usize;
        if buf.len() < total {
            return None;
        }

        let candidate = buf.split_to(total).freeze();

        if candidate[total - 2..] != FOOTER {
            sink(DecodeEvent::Corrupt(CorruptFrame::FooterMismatch { candidate }));
            continue;
        }

        let received = candidate[total - 3];
        let computed = checksum(&candidate[2..total - 3]);
        if received != computed {
            sink(DecodeEvent::Corrupt(CorruptFrame::ChecksumMismatch {
                candidate,
                received,
                computed,
            }));
            continue;
        }

        let cmd = candidate[2];
        let mut payload = candidate;
        payload.advance(4);
        payload.truncate(total - MIN_FRAME_LEN);
        return Some(Frame::from_parts(cmd, payload));
    }
}

fn find_header(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER.len()).position(|w| w == HEADER)
}

pub(crate) fn log_event(event: &DecodeEvent) {
    match event {
        DecodeEvent::Discarded { bytes } => {
            debug!(len = bytes.len(), bytes = %to_hex(bytes), "discarded bytes before header");
        }
        DecodeEvent::Flushed { len } => {
            warn!(len, "no header in buffered bytes, buffer cleared");
        }
        DecodeEvent::Corrupt(corrupt) => {
            warn!(
                candidate = %to_hex(corrupt.candidate()),
                "dropped corrupt frame: {corrupt}"
            );
        }
    }
}
