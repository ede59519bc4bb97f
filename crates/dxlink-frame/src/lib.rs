//! Resynchronizing frame codec for the DX serial command protocol.
//!
//! Every command exchanged with the arm controller travels in one frame:
//! - A 2-byte header `0x44 0x58` ("DX")
//! - A command byte and a 1-byte payload length
//! - The payload, then an 8-bit additive checksum over `cmd + length + payload`
//! - A 2-byte footer `0x58 0x44` ("XD")
//!
//! The serial link has no message boundaries, so [`StreamDecoder`] buffers
//! raw bytes, skips noise, and only emits frames whose footer and checksum
//! verify. Corrupt candidates are reported as [`DecodeEvent`]s, never as
//! errors.

pub mod checksum;
pub mod codec;
pub mod command;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod hex;
pub mod position;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use checksum::checksum;
pub use codec::{
    encode, encode_frame, encode_position, encode_position_into, Frame, FOOTER, HEADER,
    MAX_PAYLOAD, MIN_FRAME_LEN,
};
pub use command::{command_name, DEFAULT_COMMAND, POSITION};
pub use decoder::{
    CorruptFrame, DecodeEvent, DecoderConfig, DecoderStats, StreamDecoder,
    DEFAULT_GARBAGE_THRESHOLD,
};
pub use dispatch::{dispatcher, FrameDispatcher, FrameQueue};
pub use error::{FrameError, Result};
pub use position::{validate_position, Limits, Position, Violation, MAX_X, MAX_Z};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::DxCodec;
