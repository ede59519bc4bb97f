use std::thread;
use std::time::Duration;

use dxlink_frame::{dispatcher, DecoderConfig, FrameError, FrameReader};
use dxlink_transport::{LinkCloser, SerialLink};
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, print_stats, Direction, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.line.link_config();
    let link = SerialLink::open(&args.port, &config)
        .map_err(|err| transport_error("open failed", err))?;
    let closer = link
        .closer()
        .map_err(|err| transport_error("open failed", err))?;
    install_ctrlc_handler(closer.clone())?;

    let decoder_config = DecoderConfig {
        garbage_threshold: args.garbage_threshold,
    };
    let (tx, rx) = dispatcher();
    let reader = thread::Builder::new()
        .name("dxlink-reader".to_string())
        .spawn(move || {
            let mut reader = FrameReader::with_config(link, decoder_config);
            let result = reader.run(&tx);
            (result, *reader.stats())
        })
        .map_err(|err| CliError::new(INTERNAL, format!("reader thread spawn failed: {err}")))?;

    info!(
        port = %args.port.display(),
        baud = args.line.baud,
        line = %config.line_settings(),
        "listening"
    );
    let mut printed = 0usize;
    loop {
        let frame = match rx.pop_timeout(POLL_INTERVAL) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            // Reader stopped: link closed locally or by the remote end.
            Err(FrameError::DispatcherClosed) => break,
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        if args.cmd.is_some_and(|cmd| cmd != frame.cmd()) {
            debug!(cmd = frame.cmd(), "frame filtered out");
            continue;
        }

        print_frame(&frame, Direction::Rx, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    closer.close();
    let (result, stats) = reader
        .join()
        .map_err(|_| CliError::new(INTERNAL, "reader thread panicked"))?;
    result.map_err(|err| frame_error("receive failed", err))?;

    let source = args.port.display().to_string();
    print_stats(&stats, 0, Some(&source), format);
    info!(printed, frames = stats.frames, corrupt = stats.corrupt(), "listener stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(closer: LinkCloser) -> CliResult<()> {
    ctrlc::set_handler(move || {
        closer.close();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
