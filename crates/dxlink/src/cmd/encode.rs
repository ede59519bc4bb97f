use dxlink_frame::{Frame, Position};
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{describe_violations, print_frame, Direction, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let position = checked_position(args.x, args.z, args.grip)?;
    let frame = Frame::position(args.cmd, &position);
    debug!(cmd = args.cmd, wire_size = frame.wire_size(), "encoded position frame");

    print_frame(&frame, Direction::Tx, format);
    Ok(SUCCESS)
}

/// Validate user-supplied coordinates, reporting every violation at once.
pub(crate) fn checked_position(x: f32, z: f32, grip: u8) -> CliResult<Position> {
    let position = Position::new(x, z, grip);
    let violations = position.validate();
    if violations.is_empty() {
        return Ok(position);
    }
    Err(CliError::new(
        DATA_INVALID,
        format!("invalid position:\n{}", describe_violations(&violations)),
    ))
}
