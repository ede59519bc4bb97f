//! Host-side link to DX serial arm controllers.
//!
//! Position commands travel to the controller as `DX`-delimited frames with
//! an additive checksum. This crate ties the layers together:
//!
//! - [`transport`]: the byte-oriented [`Link`](transport::Link) trait and
//!   the serial/Unix-socket implementation
//! - [`frame`]: encoder, payload validation, the resynchronizing stream
//!   decoder, and the reader/dispatcher pump
//!
//! ```
//! use dxlink::frame::{encode_position, StreamDecoder};
//!
//! let wire = encode_position(0x01, 150.5, 300.0, 1).unwrap();
//! let frames = StreamDecoder::new().feed(&wire);
//! assert_eq!(frames[0].to_position().unwrap().x, 150.5);
//! ```

/// Re-export transport types.
pub mod transport {
    pub use dxlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use dxlink_frame::*;
}
