use std::path::PathBuf;

/// A field did not fit into its bounded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("field exceeds {capacity} bytes")]
pub struct CapacityExceeded {
    pub capacity: usize,
}

/// Malformed input from the instrument.
///
/// Every violation except [`ProtocolError::UnexpectedByte`] makes the session
/// discard input until the line goes quiet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A byte other than `[` arrived while no transfer was in progress.
    #[error("unexpected character 0x{0:02x} received")]
    UnexpectedByte(u8),

    #[error("received key name is too long")]
    KeyTooLong,

    #[error("received FILENAME is too long")]
    FileNameTooLong,

    #[error("received FILESIZE is too long")]
    FileSizeTooLong,

    /// The value following a key did not start with `<`.
    #[error("{key} value must start with '<', got 0x{found:02x}")]
    MissingValueOpen { key: &'static str, found: u8 },

    #[error("received empty FILENAME")]
    EmptyFileName,

    #[error("received FILENAME contains forbidden characters: {0}")]
    ForbiddenFileNameChars(String),

    #[error("received FILESIZE key before FILENAME")]
    FileSizeBeforeFileName,

    #[error("received FILESIZE key again")]
    DuplicateFileSize,

    #[error("received invalid FILESIZE: {0}")]
    InvalidFileSize(String),

    #[error("received FILESIZE out of range: {0}")]
    FileSizeOutOfRange(String),

    #[error("received zero FILESIZE")]
    ZeroFileSize,

    /// Payload bytes started before any FILESIZE was declared.
    #[error("missing FILESIZE")]
    MissingFileSize,
}

/// Failures of the storage writer. None of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot create directory {path}: {source}")]
    CreateDirs {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot open/create file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write to file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot finalize file {path}: {source}")]
    Finalize {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that end the receive loop.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    /// Polling or reading the channel failed.
    #[error("channel fault: {0}")]
    Channel(#[from] cyflowrec_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, ReceiveError>;
