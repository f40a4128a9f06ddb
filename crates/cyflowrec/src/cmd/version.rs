use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("cyflowrec {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("CYFLOWREC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "line defaults: {} baud, 8 data bits, no parity, 2 stop bits",
        cyflowrec_transport::LineSettings::default().baud_rate
    );
    println!(
        "message timeout: {} ms",
        cyflowrec_receiver::DEFAULT_MESSAGE_TIMEOUT.as_millis()
    );

    Ok(SUCCESS)
}
