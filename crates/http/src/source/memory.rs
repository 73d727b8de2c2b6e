use crate::source::{ByteSource, Cursor};
use async_trait::async_trait;
use bytes::Bytes;
use std::io;

/// A [`ByteSource`] over an in-memory buffer, reads are zero-copy slices.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    cursor: Cursor,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let cursor = Cursor::new(data.len() as u64);
        Self { data, cursor }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read(&mut self, up_to: usize) -> io::Result<(Bytes, bool)> {
        let n = self.cursor.next_read(up_to);
        // position never exceeds the buffer length, which is a usize
        let start = usize::try_from(self.cursor.position).map_err(io::Error::other)?;
        let chunk = self.data.slice(start..start + n);
        let exhausted = self.cursor.advance(n as u64);
        Ok((chunk, exhausted))
    }

    fn skip(&mut self, n: u64) -> bool {
        self.cursor.advance(n)
    }

    fn len(&self) -> u64 {
        self.cursor.len
    }

    fn position(&self) -> u64 {
        self.cursor.position
    }
}

#[cfg(test)]
mod tests {
    use super::MemorySource;
    use crate::source::ByteSource;

    #[tokio::test]
    async fn reads_in_chunks_until_exhausted() {
        let mut source = MemorySource::new("hello world");
        assert_eq!(source.len(), 11);

        let (chunk, exhausted) = source.read(5).await.unwrap();
        assert_eq!(chunk.as_ref(), b"hello");
        assert!(!exhausted);

        let (chunk, exhausted) = source.read(5).await.unwrap();
        assert_eq!(chunk.as_ref(), b" worl");
        assert!(!exhausted);

        let (chunk, exhausted) = source.read(5).await.unwrap();
        assert_eq!(chunk.as_ref(), b"d");
        assert!(exhausted);
    }

    #[tokio::test]
    async fn last_byte_is_delivered_with_exhaustion() {
        let mut source = MemorySource::new("abc");
        let (chunk, exhausted) = source.read(2).await.unwrap();
        assert_eq!(chunk.as_ref(), b"ab");
        assert!(!exhausted);

        let (chunk, exhausted) = source.read(2).await.unwrap();
        assert_eq!(chunk.as_ref(), b"c");
        assert!(exhausted);
    }

    #[tokio::test]
    async fn skip_moves_the_cursor() {
        let mut source = MemorySource::new("0123456789");
        assert!(!source.skip(7));
        assert_eq!(source.position(), 7);

        let (chunk, exhausted) = source.read(10).await.unwrap();
        assert_eq!(chunk.as_ref(), b"789");
        assert!(exhausted);
    }

    #[tokio::test]
    async fn skip_past_the_end_is_exhausted() {
        let mut source = MemorySource::new("0123");
        assert!(source.skip(4));
        assert_eq!(source.position(), 4);

        let (chunk, exhausted) = source.read(10).await.unwrap();
        assert!(chunk.is_empty());
        assert!(exhausted);
    }
}
