//! Known command bytes.
//!
//! The command byte is opaque to the codec; any value 0x00-0xFF frames
//! correctly. Only the arm-position command has a typed payload.

/// Move the arm: payload is a [`Position`](crate::Position).
pub const POSITION: u8 = 0x01;

/// Command byte used when the caller does not pick one.
pub const DEFAULT_COMMAND: u8 = POSITION;

/// Returns a human-readable name for a command byte.
pub fn command_name(cmd: u8) -> &'static str {
    match cmd {
        POSITION => "POSITION",
        _ => "USER",
    }
}
