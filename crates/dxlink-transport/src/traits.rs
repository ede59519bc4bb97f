use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Baud rate used by the arm controller firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Upper bound on how long a single [`Link::read`] may block.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A byte-oriented, boundary-less link to the controller.
///
/// Implementations must keep `read` short: it returns `Ok(0)` when nothing
/// arrived within the read timeout, so callers can poll a shutdown flag
/// between reads. Once the link is closed every call returns
/// [`TransportError::Closed`](crate::TransportError::Closed) promptly.
pub trait Link: Send {
    /// Read whatever bytes are available into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `bytes` before returning.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Whether the link can still be read from or written to.
    fn is_open(&self) -> bool;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<L: Link + ?Sized> Link for &mut L {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

/// Stop bits after each character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    /// Only meaningful with 5 data bits; POSIX serial drivers apply two.
    OnePointFive,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl FromStr for DataBits {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "5" => Ok(Self::Five),
            "6" => Ok(Self::Six),
            "7" => Ok(Self::Seven),
            "8" => Ok(Self::Eight),
            other => Err(invalid_setting("data bits", other, "5, 6, 7 or 8")),
        }
    }
}

impl FromStr for StopBits {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(Self::One),
            "1.5" => Ok(Self::OnePointFive),
            "2" => Ok(Self::Two),
            other => Err(invalid_setting("stop bits", other, "1, 1.5 or 2")),
        }
    }
}

impl FromStr for Parity {
    type Err = TransportError;

    /// Accepts `N`/`E`/`O` or the full names, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(Self::None),
            "e" | "even" => Ok(Self::Even),
            "o" | "odd" => Ok(Self::Odd),
            _ => Err(invalid_setting("parity", s, "N, E or O")),
        }
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        };
        write!(f, "{bits}")
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::OnePointFive => "1.5",
            Self::Two => "2",
        })
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "N",
            Self::Even => "E",
            Self::Odd => "O",
        })
    }
}

fn invalid_setting(setting: &'static str, value: &str, expected: &'static str) -> TransportError {
    TransportError::InvalidSetting {
        setting,
        value: value.to_string(),
        expected,
    }
}

/// Line settings applied when a link is opened.
///
/// Only the read timeout applies to socket links; the rest configure tty
/// devices.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Any rate the serial driver accepts.
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    /// Maximum time a read blocks before returning `Ok(0)`.
    pub read_timeout: Duration,
}

impl LinkConfig {
    /// Frame settings in the usual `8N1` notation.
    pub fn line_settings(&self) -> String {
        format!("{}{}{}", self.data_bits, self.parity, self.stop_bits)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_controller_firmware() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.read_timeout, Duration::from_millis(100));
        assert_eq!(cfg.line_settings(), "8N1");
    }

    #[test]
    fn parses_line_settings() {
        assert_eq!("5".parse::<DataBits>().unwrap(), DataBits::Five);
        assert_eq!("7".parse::<DataBits>().unwrap(), DataBits::Seven);
        assert_eq!("1.5".parse::<StopBits>().unwrap(), StopBits::OnePointFive);
        assert_eq!("2".parse::<StopBits>().unwrap(), StopBits::Two);
        assert_eq!("E".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("odd".parse::<Parity>().unwrap(), Parity::Odd);
        assert_eq!("n".parse::<Parity>().unwrap(), Parity::None);
    }

    #[test]
    fn rejects_unknown_line_settings() {
        assert!(matches!(
            "9".parse::<DataBits>(),
            Err(TransportError::InvalidSetting { setting: "data bits", .. })
        ));
        assert!("3".parse::<StopBits>().is_err());
        assert!("mark".parse::<Parity>().is_err());
    }

    #[test]
    fn line_settings_notation() {
        let cfg = LinkConfig {
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            ..LinkConfig::default()
        };
        assert_eq!(cfg.line_settings(), "7E2");
    }
}
