use std::time::Duration;

use cyflowrec_receiver::{Receiver, ReceiverConfig, StoragePolicy};
use cyflowrec_transport::{LineSettings, SerialPort};
use tracing::{info, warn};

use crate::cmd::ReceiveArgs;
use crate::exit::{receive_error, transport_error, CliError, CliResult, USAGE};

pub fn run(args: ReceiveArgs) -> CliResult<i32> {
    let message_timeout = parse_duration(&args.message_timeout)?;

    let port = SerialPort::open(&args.port_dev)
        .map_err(|err| transport_error("cannot open port", err))?;
    if args.skip_line_setup {
        warn!(path = %args.port_dev.display(), "line setup skipped, using device as is");
    } else {
        let settings = LineSettings {
            baud_rate: args.baud,
            ..LineSettings::default()
        };
        port.configure(&settings)
            .map_err(|err| transport_error("cannot set port attributes", err))?;
    }

    let policy = StoragePolicy {
        create_missing_dirs: args.create_dirs,
        on_name_collision: args.on_collision.into(),
    };
    info!(
        storage_dir = %args.storage_dir.display(),
        create_dirs = policy.create_missing_dirs,
        on_collision = policy.on_name_collision.as_str(),
        "storage policy"
    );
    let config = ReceiverConfig::new(&args.storage_dir)
        .with_policy(policy)
        .with_message_timeout(message_timeout);

    let mut receiver = Receiver::new(port, config);
    let Err(err) = receiver.run();

    let stats = receiver.session().stats();
    info!(
        stored = stats.stored,
        dropped = stats.dropped,
        unstored = stats.unstored,
        truncated = stats.truncated,
        aborted = stats.aborted,
        protocol_errors = stats.protocol_errors,
        "receive session ended"
    );

    Err(receive_error("receive failed", err))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration(" 2 ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-1s").is_err());
    }
}
