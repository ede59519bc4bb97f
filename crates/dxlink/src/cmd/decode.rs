use std::io::Read;

use dxlink_frame::hex::{parse_hex, to_hex};
use dxlink_frame::{DecodeEvent, DecoderConfig, StreamDecoder};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frame, print_stats, Direction, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (bytes, source) = read_input(&args)?;
    let mut decoder = StreamDecoder::with_config(DecoderConfig {
        garbage_threshold: args.garbage_threshold,
    });

    let frames = decoder.feed_with(&bytes, |event| {
        if let OutputFormat::Pretty = format {
            println!("{}", describe_event(event));
        }
    });

    for frame in &frames {
        print_frame(frame, Direction::Rx, format);
    }
    print_stats(decoder.stats(), decoder.pending(), Some(&source), format);

    if frames.is_empty() && !bytes.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid frames in {} bytes from {source}", bytes.len()),
        ));
    }
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<(Vec<u8>, String)> {
    if let Some(hex) = &args.hex {
        let bytes = parse_hex(hex).map_err(|err| CliError::new(USAGE, format!("--hex: {err}")))?;
        return Ok((bytes, "hex".to_string()));
    }
    if let Some(path) = &args.file {
        let bytes = std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok((bytes, path.display().to_string()));
    }
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok((bytes, "stdin".to_string()))
}

fn describe_event(event: &DecodeEvent) -> String {
    match event {
        DecodeEvent::Discarded { bytes } => {
            format!("-- discarded {} bytes: {}", bytes.len(), to_hex(bytes))
        }
        DecodeEvent::Flushed { len } => format!("-- flushed {len} bytes with no header"),
        DecodeEvent::Corrupt(corrupt) => format!("-- dropped candidate: {corrupt}"),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn hex_input_is_parsed() {
        let args = DecodeArgs {
            hex: Some("44 58 20 00 20 58 44".to_string()),
            file: None,
            garbage_threshold: 100,
        };
        let (bytes, source) = read_input(&args).unwrap();
        assert_eq!(bytes.len(), 7);
        assert_eq!(source, "hex");
    }

    #[test]
    fn bad_hex_is_usage_error() {
        let args = DecodeArgs {
            hex: Some("4G".to_string()),
            file: None,
            garbage_threshold: 100,
        };
        assert_eq!(read_input(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn events_render_for_humans() {
        let discarded = DecodeEvent::Discarded {
            bytes: Bytes::from_static(&[0xAA, 0x01]),
        };
        assert_eq!(describe_event(&discarded), "-- discarded 2 bytes: AA 01");
        assert_eq!(
            describe_event(&DecodeEvent::Flushed { len: 101 }),
            "-- flushed 101 bytes with no header"
        );
    }
}
