//! Stream capability handed to codecs.
//!
//! Codecs see the stream only through callbacks with C-style result
//! conventions: a byte count or `(size_t)-1` for reads, a byte count or `-1`
//! for skips, a boolean for seeks. `CodecStream` is the Rust-side capability
//! set and `StreamAdapter` translates it into those conventions.

use crate::error::Result;
use crate::memory_stream::MemoryStream;
use log::trace;

/// Value a read callback returns to signal failure or end of stream.
pub const READ_FAILED: usize = usize::MAX;

/// Value a write callback returns to signal failure.
pub const WRITE_FAILED: usize = usize::MAX;

/// Value a skip callback returns to signal failure.
pub const SKIP_FAILED: i64 = -1;

/// Random-access byte stream a codec reads from or writes into.
pub trait CodecStream {
    fn read(&mut self, destination: &mut [u8]) -> Result<usize>;
    fn write(&mut self, data: &[u8]) -> Result<()>;
    fn skip(&mut self, count: i64) -> i64;
    fn seek(&mut self, offset: i64) -> Result<()>;
    /// Total number of bytes available, reported to the codec up front when
    /// decoding.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CodecStream for MemoryStream {
    fn read(&mut self, destination: &mut [u8]) -> Result<usize> {
        MemoryStream::read(self, destination)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        MemoryStream::write(self, data)
    }

    fn skip(&mut self, count: i64) -> i64 {
        MemoryStream::skip(self, count)
    }

    fn seek(&mut self, offset: i64) -> Result<()> {
        MemoryStream::seek(self, offset)
    }

    fn len(&self) -> usize {
        MemoryStream::len(self)
    }
}

/// Direction a codec stream is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    /// The codec reads compressed data (decoding).
    Input,
    /// The codec writes compressed data (encoding).
    Output,
}

/// Binds a `CodecStream` to the codec's callback slots.
pub struct StreamAdapter<'s> {
    stream: &'s mut dyn CodecStream,
    direction: StreamDirection,
}

impl<'s> StreamAdapter<'s> {
    pub fn new(stream: &'s mut dyn CodecStream, direction: StreamDirection) -> Self {
        Self { stream, direction }
    }

    pub fn direction(&self) -> StreamDirection {
        self.direction
    }

    pub fn data_length(&self) -> u64 {
        self.stream.len() as u64
    }

    /// Read callback. Returns the exact number of bytes copied, or
    /// `READ_FAILED` when nothing could be read. A zero-byte read is
    /// reported as `READ_FAILED` since codecs treat it as end of stream.
    pub fn read(&mut self, destination: &mut [u8]) -> usize {
        match self.stream.read(destination) {
            Ok(0) => READ_FAILED,
            Ok(count) => {
                trace!("stream read {} of {} bytes", count, destination.len());
                count
            }
            Err(_) => READ_FAILED,
        }
    }

    /// Write callback. Writes never fail part way: the full length is
    /// reported, or `WRITE_FAILED` when the stream could not grow.
    pub fn write(&mut self, data: &[u8]) -> usize {
        match self.stream.write(data) {
            Ok(()) => data.len(),
            Err(_) => WRITE_FAILED,
        }
    }

    /// Skip callback.
    pub fn skip(&mut self, count: i64) -> i64 {
        if count < 0 {
            return SKIP_FAILED;
        }
        self.stream.skip(count)
    }

    /// Seek callback.
    pub fn seek(&mut self, offset: i64) -> bool {
        self.stream.seek(offset).is_ok()
    }

    /// Release callback. The buffer belongs to the caller of the encode or
    /// decode operation, so there is nothing to free here.
    pub fn release(&mut self) {}
}
