use std::path::PathBuf;

/// Errors that can occur while opening or polling the serial device.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read or apply the terminal attributes.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The readiness wait itself failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),

    /// The device reported an error condition while waiting for data.
    #[error("device error condition (revents {revents:#x})")]
    DeviceFault { revents: i16 },

    /// An I/O error occurred on the device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
