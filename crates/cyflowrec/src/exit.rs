use std::fmt;
use std::io;

use cyflowrec_frame::FrameError;
use cyflowrec_receiver::ReceiveError;
use cyflowrec_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DEVICE_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const NOT_FOUND: i32 = 44;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => NOT_FOUND,
        _ => DEVICE_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { path, source } => {
            io_error(&format!("{context} {}", path.display()), source)
        }
        TransportError::UnsupportedBaudRate(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(DEVICE_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn receive_error(context: &str, err: ReceiveError) -> CliError {
    match err {
        ReceiveError::Channel(err) => frame_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_maps_to_not_found() {
        let err = TransportError::Open {
            path: "/dev/ttyNOPE".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = transport_error("cannot open port", err);
        assert_eq!(cli.code, NOT_FOUND);
        assert!(cli.message.contains("/dev/ttyNOPE"));
    }

    #[test]
    fn hangup_maps_to_failure() {
        let cli = receive_error(
            "receive failed",
            ReceiveError::Channel(FrameError::ConnectionClosed),
        );
        assert_eq!(cli.code, FAILURE);
    }

    #[test]
    fn bad_baud_rate_is_usage_error() {
        let cli = transport_error("cannot set port attributes", TransportError::UnsupportedBaudRate(7));
        assert_eq!(cli.code, USAGE);
    }
}
