use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dxlink_frame::{Frame, FrameReader, FrameWriter};
use dxlink_transport::SerialLink;
use tracing::{debug, info};

use crate::cmd::encode::checked_position;
use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_frame, Direction, OutputFormat};

/// Auto-send never fires faster than this.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Granularity at which a pending interval notices Ctrl-C.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = effective_interval(parse_duration(&args.interval)?);
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let position = checked_position(args.x, args.z, args.grip)?;
    let frame = Frame::position(args.cmd, &position);

    let config = args.line.link_config();
    let link = SerialLink::open(&args.port, &config)
        .map_err(|err| transport_error("open failed", err))?;
    // Cloned before the first write so a fast reply is not missed.
    let response_link = if args.wait {
        Some(
            link.try_clone()
                .map_err(|err| transport_error("open failed", err))?,
        )
    } else {
        None
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut writer = FrameWriter::new(link);
    let mut sent = 0u64;
    while running.load(Ordering::SeqCst) {
        writer
            .write_frame(&frame)
            .map_err(|err| frame_error("send failed", err))?;
        sent = sent.saturating_add(1);
        print_frame(&frame, Direction::Tx, format);

        if args.repeat != 0 && sent >= args.repeat {
            break;
        }
        pause(interval, &running);
    }
    info!(sent, port = %args.port.display(), "send finished");

    if let Some(link) = response_link {
        let mut reader = FrameReader::new(link);
        let response = reader
            .read_frame_timeout(wait_timeout)
            .map_err(|err| frame_error("receive failed", err))?
            .ok_or_else(|| {
                CliError::new(
                    TIMEOUT,
                    format!("no response within {}ms", wait_timeout.as_millis()),
                )
            })?;
        debug!(stats = ?reader.stats(), "response received");
        print_frame(&response, Direction::Rx, format);
    }

    Ok(SUCCESS)
}

fn effective_interval(requested: Duration) -> Duration {
    requested.max(MIN_INTERVAL)
}

fn pause(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
