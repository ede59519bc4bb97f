use crate::position::Violation;

/// Errors that can occur while encoding frames or moving them over a link.
///
/// Malformed input on the receive side is not an error: the decoder
/// discards it and reports a [`DecodeEvent`](crate::DecodeEvent) instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    InvalidPayload { size: usize, max: usize },

    /// One or more position fields are outside their domain.
    #[error("position out of range: {}", join_violations(.0))]
    OutOfRange(Vec<Violation>),

    /// A frame's payload does not have the layout its command requires.
    #[error("command 0x{cmd:02X} payload is {actual} bytes, expected {expected}")]
    MalformedPayload {
        cmd: u8,
        expected: usize,
        actual: usize,
    },

    /// The underlying link failed or was closed.
    #[error("link error: {0}")]
    Link(#[from] dxlink_transport::TransportError),

    /// An I/O error surfaced through a stream codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The consuming side of the frame queue has gone away.
    #[error("frame dispatcher closed")]
    DispatcherClosed,
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, FrameError>;
