use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dxlink_transport::{Link, TransportError};
use tracing::debug;

use crate::codec::Frame;
use crate::decoder::{DecoderConfig, DecoderStats, StreamDecoder};
use crate::dispatch::FrameDispatcher;
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads validated frames from any [`Link`].
///
/// Owns the link's [`StreamDecoder`]; partial frames, noise, and corrupt
/// candidates are handled internally so callers only ever see complete,
/// verified frames.
pub struct FrameReader<L> {
    link: L,
    decoder: StreamDecoder,
    ready: VecDeque<Frame>,
    chunk: Box<[u8]>,
}

impl<L: Link> FrameReader<L> {
    /// Create a new frame reader with default decoder configuration.
    pub fn new(link: L) -> Self {
        Self::with_config(link, DecoderConfig::default())
    }

    /// Create a new frame reader with explicit decoder configuration.
    pub fn with_config(link: L, config: DecoderConfig) -> Self {
        Self::from_parts(link, StreamDecoder::with_config(config))
    }

    /// Perform one link read and return the frames it completed.
    ///
    /// An idle link yields an empty list.
    pub fn poll(&mut self) -> Result<Vec<Frame>> {
        if !self.ready.is_empty() {
            return Ok(self.ready.drain(..).collect());
        }
        let read = self.link.read(&mut self.chunk)?;
        if read == 0 {
            return Ok(Vec::new());
        }
        Ok(self.decoder.feed(&self.chunk[..read]))
    }

    /// Read the next frame, blocking until one arrives or the link fails.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.next_ready()? {
                return Ok(frame);
            }
        }
    }

    /// Read the next frame, giving up after `timeout`.
    ///
    /// The deadline is checked between link reads, so the call may overrun
    /// by up to one link read timeout.
    pub fn read_frame_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.next_ready()? {
                return Ok(Some(frame));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Pump frames into `dispatcher` until the link closes.
    ///
    /// A closed link ends the loop with `Ok(())`; any other link failure is
    /// returned. The decoder keeps its state either way, so the reader can be
    /// resumed on a fresh link via [`FrameReader::replace_link`].
    pub fn run(&mut self, dispatcher: &FrameDispatcher) -> Result<()> {
        loop {
            match self.poll() {
                Ok(frames) => {
                    for frame in frames {
                        dispatcher.push(frame)?;
                    }
                }
                Err(FrameError::Link(TransportError::Closed)) => {
                    debug!(stats = ?self.decoder.stats(), "link closed, reader stopping");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn next_ready(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.ready.pop_front() {
            return Ok(Some(frame));
        }
        let read = self.link.read(&mut self.chunk)?;
        if read > 0 {
            self.ready.extend(self.decoder.feed(&self.chunk[..read]));
        }
        Ok(self.ready.pop_front())
    }

    /// Decoder counters accumulated so far.
    pub fn stats(&self) -> &DecoderStats {
        self.decoder.stats()
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Swap in a new link and return the old one.
    ///
    /// The decoder and any queued frames are kept, so a frame split across a
    /// reconnect still completes on the new link.
    pub fn replace_link(&mut self, link: L) -> L {
        std::mem::replace(&mut self.link, link)
    }

    /// Consume the reader and return the link.
    ///
    /// Buffered partial input is lost; use [`FrameReader::into_parts`] to keep it.
    pub fn into_inner(self) -> L {
        self.link
    }

    /// Consume the reader and return the link together with its decoder.
    ///
    /// Frames already decoded but not yet returned are dropped.
    pub fn into_parts(self) -> (L, StreamDecoder) {
        (self.link, self.decoder)
    }

    /// Build a reader around a decoder carried over from an earlier link.
    pub fn from_parts(link: L, decoder: StreamDecoder) -> Self {
        Self {
            link,
            decoder,
            ready: VecDeque::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
        }
    }
}
