use std::path::PathBuf;

/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open or connect the socket at the given path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The serial device could not be opened with the requested settings.
    #[error("failed to open serial device {path}: {source}")]
    SerialOpen {
        path: PathBuf,
        #[source]
        source: serialport::Error,
    },

    /// A serial port operation failed after the device was opened.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A line setting could not be parsed.
    #[error("invalid {setting}: {value:?} (expected {expected})")]
    InvalidSetting {
        setting: &'static str,
        value: String,
        expected: &'static str,
    },

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has been closed locally or by the remote end.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
