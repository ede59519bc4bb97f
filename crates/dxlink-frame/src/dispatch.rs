//! Hand-off of decoded frames from the link-reading thread to a consumer.
//!
//! A single unbounded queue: the producer never blocks and never drops a
//! frame, the consumer polls without blocking or waits with a timeout.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// Create a connected producer/consumer pair.
pub fn dispatcher() -> (FrameDispatcher, FrameQueue) {
    let (tx, rx) = mpsc::channel();
    (FrameDispatcher { tx }, FrameQueue { rx })
}

/// Producing half, owned by the link-reading activity.
#[derive(Debug)]
pub struct FrameDispatcher {
    tx: Sender<Frame>,
}

impl FrameDispatcher {
    /// Enqueue a validated frame. Never blocks.
    ///
    /// Fails only when the [`FrameQueue`] has been dropped.
    pub fn push(&self, frame: Frame) -> Result<()> {
        self.tx.send(frame).map_err(|_| FrameError::DispatcherClosed)
    }
}

/// Consuming half, owned by the application.
#[derive(Debug)]
pub struct FrameQueue {
    rx: Receiver<Frame>,
}

impl FrameQueue {
    /// Take the oldest queued frame, if any, without blocking.
    pub fn try_pop(&self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next frame.
    ///
    /// Returns `Ok(None)` on timeout and `Err(DispatcherClosed)` once the
    /// producer is gone and every queued frame has been delivered.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(FrameError::DispatcherClosed),
        }
    }

    /// Take every frame queued right now.
    pub fn drain(&self) -> Vec<Frame> {
        self.rx.try_iter().collect()
    }
}
