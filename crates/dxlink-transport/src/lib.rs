//! Byte-oriented link abstraction for talking to an embedded controller.
//!
//! The link offers no message boundaries: reads return whatever bytes have
//! arrived (possibly none), writes push raw bytes. Framing lives one layer up
//! in `dxlink-frame`.
//!
//! - [`Link`] is the seam the frame layer consumes.
//! - [`SerialLink`] implements it over a serial device (opened with the
//!   `serialport` crate, any baud rate and character format) or
//!   a connected Unix domain socket (simulators, `socat` bridges, tests).

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::{
    DataBits, Link, LinkConfig, Parity, StopBits, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT,
};

#[cfg(unix)]
pub use serial::{LinkCloser, SerialLink};
