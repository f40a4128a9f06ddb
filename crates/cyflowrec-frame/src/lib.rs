//! Timeout-driven reads over a byte channel.
//!
//! The instrument sends its data in small, irregular chunks. Every poll cycle
//! produces one [`ReadEvent`]: either the bytes that arrived or a timeout with
//! no data. Silence is the protocol's only recovery signal, so the reader never
//! retries on its own.

pub mod error;
pub mod reader;

pub use error::{FrameError, Result};
pub use reader::{FrameReader, ReadEvent, CHUNK_CAPACITY};
