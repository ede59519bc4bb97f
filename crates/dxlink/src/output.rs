use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dxlink_frame::hex::to_hex;
use dxlink_frame::{command_name, DecoderStats, Frame, Position, Violation};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Which way a frame travelled.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Tx,
    Rx,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Tx => "TX",
            Direction::Rx => "RX",
        }
    }
}

#[derive(Serialize)]
struct PositionOutput {
    x: f32,
    z: f32,
    grip: u8,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    direction: Direction,
    cmd: u8,
    cmd_name: &'a str,
    length: u8,
    payload: String,
    wire: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<PositionOutput>,
    timestamp: String,
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    stats: StatsFields,
    pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
}

#[derive(Serialize)]
struct StatsFields {
    frames: u64,
    discarded_bytes: u64,
    flushes: u64,
    footer_mismatches: u64,
    checksum_mismatches: u64,
}

impl From<&DecoderStats> for StatsFields {
    fn from(stats: &DecoderStats) -> Self {
        Self {
            frames: stats.frames,
            discarded_bytes: stats.discarded_bytes,
            flushes: stats.flushes,
            footer_mismatches: stats.footer_mismatches,
            checksum_mismatches: stats.checksum_mismatches,
        }
    }
}

pub fn print_frame(frame: &Frame, direction: Direction, format: OutputFormat) {
    let wire = frame.to_bytes();
    let position = frame.to_position().ok();

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: "frame",
                direction,
                cmd: frame.cmd(),
                cmd_name: command_name(frame.cmd()),
                length: frame.length(),
                payload: to_hex(frame.payload()),
                wire: to_hex(&wire),
                position: position.map(|p| PositionOutput {
                    x: p.x,
                    z: p.z,
                    grip: p.grip,
                }),
                timestamp: now_unix_millis(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DIR", "CMD", "LEN", "POSITION", "WIRE"])
                .add_row(vec![
                    direction.label().to_string(),
                    format!("0x{:02X} ({})", frame.cmd(), command_name(frame.cmd())),
                    frame.length().to_string(),
                    position.as_ref().map(format_position).unwrap_or_default(),
                    to_hex(&wire),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}: {}", direction.label(), to_hex(&wire));
            if let Some(position) = &position {
                println!("    {}", format_position(position));
            }
        }
        OutputFormat::Raw => print_raw(&wire),
    }
}

/// Print decoder counters. Raw output carries frame bytes only, so nothing
/// is written there.
pub fn print_stats(stats: &DecoderStats, pending: usize, source: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            kind: "stats",
            stats: stats.into(),
            pending,
            source,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["FRAMES", "DISCARDED", "FLUSHES", "FOOTER ERR", "CHECKSUM ERR"])
                .add_row(vec![
                    stats.frames.to_string(),
                    stats.discarded_bytes.to_string(),
                    stats.flushes.to_string(),
                    stats.footer_mismatches.to_string(),
                    stats.checksum_mismatches.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "frames={} discarded={} flushes={} footer_errors={} checksum_errors={} pending={}",
            stats.frames,
            stats.discarded_bytes,
            stats.flushes,
            stats.footer_mismatches,
            stats.checksum_mismatches,
            pending
        ),
        OutputFormat::Raw => {}
    }
}

/// Human-readable position line, e.g. `x=150.50mm z=300.00mm grip=yes`.
pub fn format_position(position: &Position) -> String {
    format!(
        "x={:.2}mm z={:.2}mm grip={}",
        position.x,
        position.z,
        if position.gripping() { "yes" } else { "no" }
    )
}

pub fn describe_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_line_matches_display_format() {
        assert_eq!(
            format_position(&Position::new(150.5, 300.0, 1)),
            "x=150.50mm z=300.00mm grip=yes"
        );
        assert_eq!(
            format_position(&Position::new(0.0, 12.25, 0)),
            "x=0.00mm z=12.25mm grip=no"
        );
    }

    #[test]
    fn violations_listed_one_per_line() {
        let violations = Position::new(2000.0, 10.0, 2).validate();
        let text = describe_violations(&violations);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("grip must be 0 or 1"));
    }

    #[test]
    fn frame_json_shape() {
        let frame = Frame::position(0x01, &Position::new(150.5, 300.0, 1));
        let out = FrameOutput {
            kind: "frame",
            direction: Direction::Rx,
            cmd: frame.cmd(),
            cmd_name: command_name(frame.cmd()),
            length: frame.length(),
            payload: to_hex(frame.payload()),
            wire: to_hex(&frame.to_bytes()),
            position: None,
            timestamp: "0".to_string(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&out).unwrap()).unwrap();
        assert_eq!(value["type"], "frame");
        assert_eq!(value["direction"], "rx");
        assert_eq!(value["cmd_name"], "POSITION");
        assert_eq!(value["length"], 9);
        assert!(value.get("position").is_none());
    }
}
