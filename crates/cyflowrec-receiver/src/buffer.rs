use bytes::{BufMut, BytesMut};

use crate::error::CapacityExceeded;

/// Longest key, file name or file size text accepted from the instrument.
pub const FIELD_CAPACITY: usize = 127;

/// Append-only byte buffer with a hard capacity.
///
/// Collects the text of one `[KEY]` or `<value>` field.
#[derive(Debug, Clone)]
pub struct FieldBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl FieldBuffer {
    pub fn new() -> Self {
        Self::with_capacity(FIELD_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one byte, or reject it if the buffer is full.
    pub fn push(&mut self, byte: u8) -> Result<(), CapacityExceeded> {
        if self.buf.len() >= self.capacity {
            return Err(CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.buf.put_u8(byte);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for FieldBuffer {
    fn default() -> Self {
        Self::new()
    }
}
