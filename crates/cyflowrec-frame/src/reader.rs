use std::io::ErrorKind;
use std::time::Duration;

use cyflowrec_transport::ByteChannel;
use tracing::trace;

use crate::error::{FrameError, Result};

/// Largest number of bytes a single read event can carry.
pub const CHUNK_CAPACITY: usize = 128;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent<'a> {
    /// Bytes that arrived before the deadline. Never empty.
    Data(&'a [u8]),
    /// The deadline passed without any byte arriving.
    Timeout,
}

/// Turns a [`ByteChannel`] into a sequence of [`ReadEvent`]s.
pub struct FrameReader<T> {
    inner: T,
    chunk: [u8; CHUNK_CAPACITY],
}

impl<T: ByteChannel> FrameReader<T> {
    /// Create a reader that exclusively owns `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            chunk: [0u8; CHUNK_CAPACITY],
        }
    }

    /// Wait up to `timeout` (`None` = forever) and read at most `max_len` bytes.
    ///
    /// `max_len` is clamped to `1..=CHUNK_CAPACITY`. Returns
    /// `Err(FrameError::ConnectionClosed)` when the channel hangs up.
    pub fn poll_read(&mut self, max_len: usize, timeout: Option<Duration>) -> Result<ReadEvent<'_>> {
        let len = max_len.clamp(1, CHUNK_CAPACITY);

        loop {
            if !self.inner.wait_readable(timeout)? {
                trace!(?timeout, "read timed out");
                return Ok(ReadEvent::Timeout);
            }

            match self.inner.read(&mut self.chunk[..len]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => return Ok(ReadEvent::Data(&self.chunk[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the channel.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
