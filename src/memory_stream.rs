//! Growable in-memory byte stream.
//!
//! `MemoryStream` stands in for the file or socket a codec expects to talk
//! to. It owns a byte buffer and a cursor; writes grow the buffer on demand,
//! reads never return more than what is stored, and `skip` may leave the
//! cursor past the end so a later write can fill the gap.

use crate::error::{Jpeg2kError, Result};
use log::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStream {
    buffer: Vec<u8>,
    position: usize,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream positioned at the start of `data`, ready for reading.
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            buffer: data,
            position: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Copies up to `destination.len()` bytes from the cursor.
    ///
    /// Returns the number of bytes copied, which is short (possibly zero) at
    /// the end of the buffer. Fails only when the cursor already lies beyond
    /// the buffer, which happens after a `skip` past the end.
    pub fn read(&mut self, destination: &mut [u8]) -> Result<usize> {
        if self.position > self.buffer.len() {
            warn!(
                "read of {} bytes at offset {} is past the end of a {} byte stream",
                destination.len(),
                self.position,
                self.buffer.len()
            );
            return Err(Jpeg2kError::ReadPastEnd {
                position: self.position as u64,
                length: self.buffer.len(),
            });
        }

        let count = destination.len().min(self.buffer.len() - self.position);
        destination[..count].copy_from_slice(&self.buffer[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }

    /// Writes `data` at the cursor, extending the buffer to exactly
    /// `position + data.len()` when needed. Any gap left by an earlier skip
    /// is zero-filled.
    ///
    /// Fails without writing anything when the grown buffer cannot be
    /// allocated.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let end = self
            .position
            .checked_add(data.len())
            .ok_or_else(|| self.write_overflow(data.len()))?;
        if end > self.buffer.len() {
            let additional = end - self.buffer.len();
            self.buffer
                .try_reserve_exact(additional)
                .map_err(|_| self.write_overflow(data.len()))?;
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(data);
        self.position = end;
        Ok(())
    }

    fn write_overflow(&self, length: usize) -> Jpeg2kError {
        warn!(
            "write of {} bytes at offset {} cannot be allocated",
            length, self.position
        );
        Jpeg2kError::WriteOverflow {
            position: self.position as u64,
            length,
        }
    }

    /// Moves the cursor forward by `count` bytes without checking the buffer
    /// length. A negative count moves it back, stopping at zero.
    pub fn skip(&mut self, count: i64) -> i64 {
        if count >= 0 {
            self.position = self.position.saturating_add(count as usize);
        } else {
            self.position = self.position.saturating_sub(count.unsigned_abs() as usize);
        }
        count
    }

    /// Moves the cursor to `offset`. Offsets past the end of the buffer or
    /// below zero are rejected and leave the cursor where it was.
    pub fn seek(&mut self, offset: i64) -> Result<()> {
        if offset < 0 || offset as u64 > self.buffer.len() as u64 {
            warn!(
                "seek to {} rejected, stream holds {} bytes",
                offset,
                self.buffer.len()
            );
            return Err(Jpeg2kError::SeekOutOfRange {
                offset,
                length: self.buffer.len(),
            });
        }
        self.position = offset as usize;
        Ok(())
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(data: Vec<u8>) -> Self {
        Self::with_data(data)
    }
}
