use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use dxlink_frame::DEFAULT_GARBAGE_THRESHOLD;
#[cfg(unix)]
use dxlink_transport::{DataBits, LinkConfig, Parity, StopBits, DEFAULT_BAUD_RATE};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
#[cfg(unix)]
pub mod listen;
#[cfg(unix)]
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a position command and print the frame.
    Encode(EncodeArgs),
    /// Run captured bytes through the stream decoder.
    Decode(DecodeArgs),
    /// Send a position command to the controller.
    #[cfg(unix)]
    Send(SendArgs),
    /// Print frames received from the controller.
    #[cfg(unix)]
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        #[cfg(unix)]
        Command::Send(args) => send::run(args, format),
        #[cfg(unix)]
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Horizontal position in millimetres (0-1000).
    #[arg(allow_negative_numbers = true)]
    pub x: f32,
    /// Vertical position in millimetres (0-500).
    #[arg(allow_negative_numbers = true)]
    pub z: f32,
    /// Gripper state: 0 open, 1 closed.
    pub grip: u8,
    /// Command byte in hex (e.g. 0x01, 1F).
    #[arg(long, default_value = "0x01", value_parser = parse_command)]
    pub cmd: u8,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex bytes to decode (whitespace ignored).
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Binary capture file to decode.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// Bytes buffered without a header before the decoder flushes.
    #[arg(long, default_value_t = DEFAULT_GARBAGE_THRESHOLD)]
    pub garbage_threshold: usize,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device or Unix socket path.
    pub port: PathBuf,
    /// Horizontal position in millimetres (0-1000).
    #[arg(allow_negative_numbers = true)]
    pub x: f32,
    /// Vertical position in millimetres (0-500).
    #[arg(allow_negative_numbers = true)]
    pub z: f32,
    /// Gripper state: 0 open, 1 closed.
    pub grip: u8,
    /// Command byte in hex (e.g. 0x01, 1F).
    #[arg(long, default_value = "0x01", value_parser = parse_command)]
    pub cmd: u8,
    #[command(flatten)]
    pub line: LineArgs,
    /// Number of times to send the frame (0 = until interrupted).
    #[arg(long, default_value_t = 1)]
    pub repeat: u64,
    /// Delay between repeated sends (e.g. 100ms, 1s). Floor: 10ms.
    #[arg(long, default_value = "100ms")]
    pub interval: String,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device or Unix socket path.
    pub port: PathBuf,
    #[command(flatten)]
    pub line: LineArgs,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print frames with this command byte (hex).
    #[arg(long, value_parser = parse_command)]
    pub cmd: Option<u8>,
    /// Bytes buffered without a header before the decoder flushes.
    #[arg(long, default_value_t = DEFAULT_GARBAGE_THRESHOLD)]
    pub garbage_threshold: usize,
}

/// Serial line settings. Ignored when the port is a Unix socket.
#[cfg(unix)]
#[derive(Args, Debug)]
pub struct LineArgs {
    /// Line speed.
    #[arg(long, env = "DXLINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Data bits per character (5-8).
    #[arg(long, default_value = "8")]
    pub data_bits: DataBits,
    /// Parity: N (none), E (even) or O (odd).
    #[arg(long, default_value = "N")]
    pub parity: Parity,
    /// Stop bits: 1, 1.5 or 2.
    #[arg(long, default_value = "1")]
    pub stop_bits: StopBits,
}

#[cfg(unix)]
impl LineArgs {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            baud_rate: self.baud,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
            ..LinkConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a command byte written in hex, with or without a `0x` prefix.
pub fn parse_command(input: &str) -> Result<u8, String> {
    let digits = input.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.is_empty() || digits.len() > 2 {
        return Err(format!("command must be one hex byte (00-FF), got {input:?}"));
    }
    // from_str_radix also takes a sign.
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid hex command byte: {input:?}"));
    }
    u8::from_str_radix(digits, 16).map_err(|_| format!("invalid hex command byte: {input:?}"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
