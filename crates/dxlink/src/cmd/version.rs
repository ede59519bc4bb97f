use dxlink_frame::{DEFAULT_GARBAGE_THRESHOLD, MAX_X, MAX_Z};
use dxlink_transport::{LinkConfig, DEFAULT_BAUD_RATE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("dxlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: dxlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("DXLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!("default_baud: {DEFAULT_BAUD_RATE}");
    println!("default_line: {}", LinkConfig::default().line_settings());
    println!("garbage_threshold: {DEFAULT_GARBAGE_THRESHOLD}");
    println!("limits: x=0-{MAX_X}mm z=0-{MAX_Z}mm");

    Ok(SUCCESS)
}
