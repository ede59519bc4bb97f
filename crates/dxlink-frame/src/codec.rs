use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{FrameError, Result};
use crate::position::{Position, POSITION_PAYLOAD_LEN};

/// Header marker: "DX" (0x44 0x58).
pub const HEADER: [u8; 2] = [0x44, 0x58];

/// Footer marker: "XD" (0x58 0x44).
pub const FOOTER: [u8; 2] = [0x58, 0x44];

/// Header (2) + cmd (1) + length (1) + checksum (1) + footer (2).
pub const MIN_FRAME_LEN: usize = 7;

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// A validated protocol frame.
///
/// Frames are immutable: the decoder only builds them after the footer and
/// checksum verified, and [`Frame::new`] rejects payloads that would not fit
/// the length field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    cmd: u8,
    payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(cmd: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::InvalidPayload {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self { cmd, payload })
    }

    /// Frame carrying an arm position. Does not range-check the values.
    pub fn position(cmd: u8, position: &Position) -> Self {
        Self {
            cmd,
            payload: Bytes::copy_from_slice(&position.to_payload()),
        }
    }

    pub(crate) fn from_parts(cmd: u8, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self { cmd, payload }
    }

    /// The command byte.
    pub fn cmd(&self) -> u8 {
        self.cmd
    }

    /// The length field as sent on the wire.
    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    /// The payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decode the payload as an arm position.
    pub fn to_position(&self) -> Result<Position> {
        Position::from_payload(&self.payload).ok_or(FrameError::MalformedPayload {
            cmd: self.cmd,
            expected: POSITION_PAYLOAD_LEN,
            actual: self.payload.len(),
        })
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_LEN + self.payload.len()
    }

    /// Encode this frame into its wire bytes.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        put_frame(self.cmd, &self.payload, &mut dst);
        dst.freeze()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────┬────────┬─────────────────┬──────────┬────────────┐
/// │ Header (2) │ Cmd │ Length │ Payload         │ Checksum │ Footer (2) │
/// │ 0x44 0x58  │ (1) │ (1)    │ (Length bytes)  │ (1)      │ 0x58 0x44  │
/// │ "DX"       │     │        │                 │          │ "XD"       │
/// └────────────┴─────┴────────┴─────────────────┴──────────┴────────────┘
/// ```
///
/// The checksum covers `cmd ++ length ++ payload`.
pub fn encode_frame(cmd: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::InvalidPayload {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    put_frame(cmd, payload, dst);
    Ok(())
}

/// Encode a frame into a fresh buffer.
pub fn encode(cmd: u8, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(MIN_FRAME_LEN + payload.len());
    encode_frame(cmd, payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Validate and encode an arm-position command.
///
/// Fails with [`FrameError::OutOfRange`] listing every invalid field.
pub fn encode_position(cmd: u8, x: f32, z: f32, grip: u8) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(MIN_FRAME_LEN + POSITION_PAYLOAD_LEN);
    encode_position_into(cmd, x, z, grip, &mut dst)?;
    Ok(dst.freeze())
}

/// Validate an arm-position command and append its frame to `dst`.
///
/// `dst` is left untouched when any field is out of range.
pub fn encode_position_into(
    cmd: u8,
    x: f32,
    z: f32,
    grip: u8,
    dst: &mut BytesMut,
) -> Result<()> {
    let position = Position::new(x, z, grip);
    let violations = position.validate();
    if !violations.is_empty() {
        return Err(FrameError::OutOfRange(violations));
    }
    put_frame(cmd, &position.to_payload(), dst);
    Ok(())
}

fn put_frame(cmd: u8, payload: &[u8], dst: &mut BytesMut) {
    let length = payload.len() as u8;
    let sum = checksum(&[cmd, length]).wrapping_add(checksum(payload));

    dst.reserve(MIN_FRAME_LEN + payload.len());
    dst.put_slice(&HEADER);
    dst.put_u8(cmd);
    dst.put_u8(length);
    dst.put_slice(payload);
    dst.put_u8(sum);
    dst.put_slice(&FOOTER);
}
