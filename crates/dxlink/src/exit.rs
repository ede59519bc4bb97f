use std::fmt;
use std::io;

use dxlink_frame::FrameError;
use dxlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    }
}

fn serial_code(err: &serialport::Error) -> i32 {
    match err.kind() {
        serialport::ErrorKind::Io(kind) => io_code(&io::Error::from(kind)),
        serialport::ErrorKind::InvalidInput => USAGE,
        serialport::ErrorKind::NoDevice | serialport::ErrorKind::Unknown => TRANSPORT_ERROR,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(&err), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. } | TransportError::Io(source) => io_code(source),
        TransportError::SerialOpen { source, .. } | TransportError::Serial(source) => {
            serial_code(source)
        }
        TransportError::InvalidSetting { .. } => USAGE,
        TransportError::Closed => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Link(err) => transport_error(context, err),
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidPayload { .. }
        | FrameError::OutOfRange(_)
        | FrameError::MalformedPayload { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::DispatcherClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
