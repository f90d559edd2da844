use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("dt8852 {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!("target: {}", option_env!("DT8852_BUILD_TARGET").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "protocol: start=0x{:02X} max_payload={}",
        dt8852::frame::START,
        dt8852::frame::DEFAULT_MAX_PAYLOAD
    );
    println!(
        "serial_defaults: port={} baud={}",
        dt8852::transport::DEFAULT_PORT,
        dt8852::transport::DEFAULT_BAUD_RATE
    );

    Ok(SUCCESS)
}
