//! Reception of files sent by the instrument over the serial line.
//!
//! A transfer is a sequence of `[KEY]<value>` fields followed by the raw file
//! content:
//!
//! ```text
//! [FILENAME]<A0000001.FCS>[FILESIZE]<9732>FCS2.0...
//! ```
//!
//! [`Session`] is the protocol state machine. It consumes read events, extracts
//! the metadata and streams the payload to the storage directory according to
//! the [`StoragePolicy`]. [`Receiver`] drives a session from a
//! [`FrameReader`](cyflowrec_frame::FrameReader) until the channel fails.

pub mod buffer;
pub mod config;
pub mod error;
pub mod receiver;
pub mod session;
pub mod storage;

pub use buffer::{FieldBuffer, FIELD_CAPACITY};
pub use config::{CollisionPolicy, ReceiverConfig, StoragePolicy, DEFAULT_MESSAGE_TIMEOUT};
pub use error::{CapacityExceeded, ProtocolError, ReceiveError, Result, StorageError};
pub use receiver::Receiver;
pub use session::{Session, SessionStats};
pub use storage::{OpenOutcome, OutputFile, TransferOutcome};
