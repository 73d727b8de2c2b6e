//! Seekable, chunked byte sources the streaming engine reads from.
//!
//! A source has a fixed length, a forward only cursor and bounded reads. [`MemorySource`] wraps
//! a buffer, [`FileSource`] reads an open file with positional reads so independent handles to
//! the same file never disturb each other.
//!
//! Exhaustion is conventional: a source is exhausted once its cursor reached its length. The
//! chunk returned together with `exhausted == true` is still valid data.

mod file;
pub use file::FileSource;

mod memory;
pub use memory::MemorySource;

use async_trait::async_trait;
use bytes::Bytes;
use std::io;

/// A finite byte sequence read in chunks.
#[async_trait]
pub trait ByteSource: Send {
    /// Reads up to `up_to` bytes at the cursor and advances it by the bytes returned.
    ///
    /// The flag is `true` once the cursor reached the end.
    async fn read(&mut self, up_to: usize) -> io::Result<(Bytes, bool)>;

    /// Moves the cursor forward by `n` bytes without reading, clamped to the end.
    ///
    /// Returns `true` if the source is exhausted afterwards.
    fn skip(&mut self, n: u64) -> bool;

    /// Total size, fixed for the lifetime of the source.
    fn len(&self) -> u64;

    /// Current cursor position.
    fn position(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases the underlying resource. Dropping the source releases it as well.
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Shared cursor arithmetic of every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    position: u64,
    len: u64,
}

impl Cursor {
    fn new(len: u64) -> Self {
        Self { position: 0, len }
    }

    fn remaining(&self) -> u64 {
        self.len - self.position
    }

    /// Number of bytes the next read of `up_to` bytes returns.
    fn next_read(&self, up_to: usize) -> usize {
        usize::try_from(self.remaining()).map_or(up_to, |remaining| remaining.min(up_to))
    }

    fn advance(&mut self, n: u64) -> bool {
        self.position = self.position.saturating_add(n).min(self.len);
        self.is_exhausted()
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.len
    }
}
