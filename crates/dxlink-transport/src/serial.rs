use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serialport::{ClearBuffer, FlowControl, SerialPort, TTYPort};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{DataBits, Link, LinkConfig, Parity, StopBits};

/// A link to the controller over a serial device or a Unix domain socket.
///
/// Serial devices are opened through `serialport` with the configured baud
/// rate, character format, no flow control, and the read timeout. A path
/// that names a Unix socket is connected instead, which lets simulators and
/// `socat` bridges stand in for hardware.
///
/// Clones made with [`try_clone`](Self::try_clone) share one closed flag, so
/// a reader thread and a writer thread observe [`close`](Self::close)
/// together.
pub struct SerialLink {
    inner: SerialLinkInner,
    path: PathBuf,
    closed: Arc<AtomicBool>,
}

enum SerialLinkInner {
    Tty(TTYPort),
    Socket(UnixStream),
}

impl SerialLink {
    /// Open the device or socket at `path`.
    pub fn open(path: impl AsRef<Path>, config: &LinkConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let metadata = std::fs::metadata(&path).map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;

        if metadata.file_type().is_socket() {
            let stream = UnixStream::connect(&path).map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;
            debug!(?path, "connected to socket link");
            return Self::with_socket(stream, path, config);
        }

        let port = open_tty(&path, config).map_err(|e| TransportError::SerialOpen {
            path: path.clone(),
            source: e,
        })?;

        info!(
            ?path,
            baud = config.baud_rate,
            settings = %config.line_settings(),
            "opened serial device"
        );

        Ok(Self {
            inner: SerialLinkInner::Tty(port),
            path,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Wrap an already opened serial port, e.g. one end of a pty pair.
    pub fn from_serial_port(port: TTYPort) -> Self {
        let path = port
            .name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("<serial-port>"));
        Self {
            inner: SerialLinkInner::Tty(port),
            path,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wrap an already connected Unix stream.
    pub fn from_unix_stream(stream: UnixStream, config: &LinkConfig) -> Result<Self> {
        Self::with_socket(stream, PathBuf::from("<unix-stream>"), config)
    }

    fn with_socket(stream: UnixStream, path: PathBuf, config: &LinkConfig) -> Result<Self> {
        let timeout = config.read_timeout.max(Duration::from_millis(1));
        stream.set_read_timeout(Some(timeout))?;
        Ok(Self {
            inner: SerialLinkInner::Socket(stream),
            path,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Duplicate the handle so reads and writes can run on separate threads.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            SerialLinkInner::Tty(port) => SerialLinkInner::Tty(port.try_clone_native()?),
            SerialLinkInner::Socket(stream) => SerialLinkInner::Socket(stream.try_clone()?),
        };
        Ok(Self {
            inner,
            path: self.path.clone(),
            closed: Arc::clone(&self.closed),
        })
    }

    /// A handle that can close this link from any thread.
    pub fn closer(&self) -> Result<LinkCloser> {
        let socket = match &self.inner {
            SerialLinkInner::Tty(_) => None,
            SerialLinkInner::Socket(stream) => Some(Arc::new(stream.try_clone()?)),
        };
        Ok(LinkCloser {
            closed: Arc::clone(&self.closed),
            socket,
        })
    }

    /// Close the link. Blocked reads on any clone return within one read timeout.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let SerialLinkInner::Socket(stream) = &self.inner {
            let _ = stream.shutdown(Shutdown::Both);
        }
        debug!(path = ?self.path, "link closed");
    }

    /// The device or socket path this link was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Link kind for diagnostics.
    pub fn link_name(&self) -> &'static str {
        match &self.inner {
            SerialLinkInner::Tty(_) => "serial",
            SerialLinkInner::Socket(_) => "unix-socket",
        }
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialLinkInner::Tty(port) => port.read(buf),
            SerialLinkInner::Socket(stream) => stream.read(buf),
        }
    }

    fn write_inner(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialLinkInner::Tty(port) => port.write(buf),
            SerialLinkInner::Socket(stream) => stream.write(buf),
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SerialLinkInner::Tty(port) => port.flush(),
            SerialLinkInner::Socket(stream) => stream.flush(),
        }
    }

    fn mark_closed(&self) -> TransportError {
        self.closed.store(true, Ordering::Release);
        TransportError::Closed
    }
}

impl Link for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let read = match self.read_inner(buf) {
            // Timeouts surface as errors, so a zero-length read is EOF: the
            // socket peer went away or the tty hung up.
            Ok(0) => {
                debug!(path = ?self.path, "remote end closed link");
                return Err(self.mark_closed());
            }
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                warn!(path = ?self.path, "device hung up");
                return Err(self.mark_closed());
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                0
            }
            Err(err) => return Err(TransportError::Io(err)),
        };

        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        Ok(read)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            if !self.is_open() {
                return Err(TransportError::Closed);
            }
            match self.write_inner(&bytes[offset..]) {
                Ok(0) => return Err(self.mark_closed()),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue
                }
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    return Err(self.mark_closed())
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.flush_inner() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("type", &self.link_name())
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Closes a [`SerialLink`] (and all its clones) from another thread.
#[derive(Clone, Debug)]
pub struct LinkCloser {
    closed: Arc<AtomicBool>,
    socket: Option<Arc<UnixStream>>,
}

impl LinkCloser {
    /// Mark the link closed and wake any blocked socket read.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(stream) = &self.socket {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Whether the link has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn open_tty(path: &Path, config: &LinkConfig) -> serialport::Result<TTYPort> {
    let stop_bits = match config.stop_bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
        StopBits::OnePointFive => {
            warn!(?path, "1.5 stop bits unsupported on POSIX ttys, using 2");
            serialport::StopBits::Two
        }
    };
    let data_bits = match config.data_bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    };
    let parity = match config.parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    };

    let port = serialport::new(path.to_string_lossy(), config.baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout.max(Duration::from_millis(1)))
        .open_native()?;
    // Stale bytes from before the open are not part of this session.
    port.clear(ClearBuffer::All)?;
    Ok(port)
}
