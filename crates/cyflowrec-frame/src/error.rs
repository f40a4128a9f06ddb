/// Errors that end a reception session.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Waiting for the channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] cyflowrec_transport::TransportError),

    /// An I/O error occurred while reading from the channel.
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel reported readiness but delivered no bytes (hang-up).
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
