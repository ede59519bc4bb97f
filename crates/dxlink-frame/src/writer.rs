use bytes::BytesMut;
use dxlink_transport::Link;
use tracing::trace;

use crate::codec::{encode_frame, encode_position_into, Frame, MAX_PAYLOAD, MIN_FRAME_LEN};
use crate::error::Result;
use crate::hex::to_hex;

/// Writes complete frames to any [`Link`].
///
/// Each frame is encoded into one buffer and handed to the link in a single
/// write while `&mut self` is held, so frames never interleave. Share a
/// writer between threads behind a `Mutex`.
pub struct FrameWriter<L> {
    link: L,
    buf: BytesMut,
}

impl<L: Link> FrameWriter<L> {
    /// Create a new frame writer.
    pub fn new(link: L) -> Self {
        Self {
            link,
            buf: BytesMut::with_capacity(MIN_FRAME_LEN + MAX_PAYLOAD),
        }
    }

    /// Write a complete frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.cmd(), frame.payload())
    }

    /// Encode and send a payload under `cmd`.
    pub fn send(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(cmd, payload, &mut self.buf)?;
        self.flush_buf(cmd)
    }

    /// Validate and send an arm-position command.
    ///
    /// Nothing is written when any field is out of range.
    pub fn send_position(&mut self, cmd: u8, x: f32, z: f32, grip: u8) -> Result<()> {
        self.buf.clear();
        encode_position_into(cmd, x, z, grip, &mut self.buf)?;
        self.flush_buf(cmd)
    }

    fn flush_buf(&mut self, cmd: u8) -> Result<()> {
        trace!(cmd, bytes = %to_hex(&self.buf), "writing frame");
        self.link.write(&self.buf)?;
        Ok(())
    }

    /// Whether the link still accepts writes.
    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the writer and return the link.
    pub fn into_inner(self) -> L {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use dxlink_transport::TransportError;

    use super::*;
    use crate::error::FrameError;
    use crate::codec::encode_position;
    use crate::decoder::StreamDecoder;

    /// Records each write call separately.
    #[derive(Default)]
    struct RecordingLink {
        writes: Vec<Vec<u8>>,
        closed: bool,
    }

    impl Link for RecordingLink {
        fn read(&mut self, _buf: &mut [u8]) -> dxlink_transport::Result<usize> {
            Ok(0)
        }

        fn write(&mut self, bytes: &[u8]) -> dxlink_transport::Result<()> {
            if self.closed {
                return Err(TransportError::Closed);
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        fn is_open(&self) -> bool {
            !self.closed
        }
    }

    #[test]
    fn one_write_per_frame() {
        let mut writer = FrameWriter::new(RecordingLink::default());
        writer.send(0x01, b"abc").unwrap();
        writer.send(0x02, b"").unwrap();

        let link = writer.into_inner();
        assert_eq!(link.writes.len(), 2);
        assert_eq!(link.writes[1], vec![0x44, 0x58, 0x02, 0x00, 0x02, 0x58, 0x44]);
    }

    #[test]
    fn written_bytes_decode() {
        let mut writer = FrameWriter::new(RecordingLink::default());
        writer.send_position(0x01, 150.5, 300.0, 1).unwrap();

        let link = writer.into_inner();
        assert_eq!(
            link.writes[0].as_slice(),
            encode_position(0x01, 150.5, 300.0, 1).unwrap().as_ref()
        );

        let frames = StreamDecoder::new().feed(&link.writes[0]);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn out_of_range_writes_nothing() {
        let mut writer = FrameWriter::new(RecordingLink::default());
        let err = writer.send_position(0x01, 2000.0, 600.0, 3).unwrap_err();

        assert!(matches!(err, FrameError::OutOfRange(ref v) if v.len() == 3));
        assert!(writer.get_ref().writes.is_empty());
    }

    #[test]
    fn send_position_matches_generic_send() {
        let mut writer = FrameWriter::new(RecordingLink::default());
        writer.send_position(0x01, 150.5, 300.0, 1).unwrap();
        let payload = crate::position::Position::new(150.5, 300.0, 1).to_payload();
        writer.send(0x01, &payload).unwrap();

        let writes = &writer.get_ref().writes;
        assert_eq!(writes[0], writes[1]);
        assert_eq!(
            writes[0],
            vec![
                0x44, 0x58, 0x01, 0x09, 0x00, 0x80, 0x16, 0x43, 0x00, 0x00, 0x96, 0x43, 0x01,
                0xBD, 0x58, 0x44
            ]
        );
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut writer = FrameWriter::new(RecordingLink::default());
        let err = writer.send(0x01, &[0u8; 256]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidPayload { .. }));
    }

    #[test]
    fn write_frame_method() {
        let mut writer = FrameWriter::new(RecordingLink::default());
        let frame = Frame::new(0x07, vec![1, 2]).unwrap();
        writer.write_frame(&frame).unwrap();
        assert_eq!(writer.get_ref().writes[0], frame.to_bytes().to_vec());
    }

    #[test]
    fn closed_link_surfaces_link_error() {
        let mut writer = FrameWriter::new(RecordingLink {
            closed: true,
            ..RecordingLink::default()
        });
        assert!(!writer.is_open());
        let err = writer.send(0x01, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Link(TransportError::Closed)));
    }

    #[test]
    fn shared_writer_never_interleaves() {
        let writer = Arc::new(Mutex::new(FrameWriter::new(RecordingLink::default())));

        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    for _ in 0..16 {
                        writer.lock().unwrap().send(t, &[t; 9]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let writer = Arc::try_unwrap(writer).ok().unwrap().into_inner().unwrap();
        let link = writer.into_inner();
        let stream: Vec<u8> = link.writes.concat();
        let frames = StreamDecoder::new().feed(&stream);
        assert_eq!(frames.len(), 64);
        assert!(frames.iter().all(|f| f.payload().iter().all(|b| *b == f.cmd())));
    }
}
