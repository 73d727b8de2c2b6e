use crate::source::{ByteSource, Cursor};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// A [`ByteSource`] over a file on disk.
///
/// The length is taken from the file metadata when the source is opened. Reads run on the
/// blocking pool and use positional reads, the shared file offset is never touched.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: Option<Arc<File>>,
    cursor: Cursor,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "path is a directory"));
        }

        let file = file.into_std().await;
        trace!(path = %path.display(), len = metadata.len(), "opened file source");
        Ok(Self { path, file: Some(Arc::new(file)), cursor: Cursor::new(metadata.len()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn read(&mut self, up_to: usize) -> io::Result<(Bytes, bool)> {
        let Some(file) = self.file.as_ref().map(Arc::clone) else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "file source is closed"));
        };

        let n = self.cursor.next_read(up_to);
        let offset = self.cursor.position;
        let chunk = tokio::task::spawn_blocking(move || read_at(&file, offset, n))
            .await
            .map_err(io::Error::other)??;

        let exhausted = self.cursor.advance(chunk.len() as u64);
        // a file that shrank since it was opened ends early
        if chunk.len() < n {
            self.cursor.advance(u64::MAX);
            return Ok((chunk, true));
        }

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

    async fn close(&mut self) -> io::Result<()> {
        if self.file.take().is_some() {
            trace!(path = %self.path.display(), "closed file source");
        }
        Ok(())
    }
}

/// Reads up to `n` bytes at `offset`, stopping early only at the end of the file.
fn read_at(file: &File, offset: u64, n: usize) -> io::Result<Bytes> {
    let mut buf = BytesMut::zeroed(n);
    let mut filled = 0;

    while filled < n {
        match positional_read(file, &mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf.freeze())
}

#[cfg(unix)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

#[cfg(test)]
mod tests {
    use super::FileSource;
    use crate::source::ByteSource;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("butler-file-source-{}-{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[tokio::test]
    async fn reads_the_whole_file_in_chunks() {
        let path = temp_file("chunks", b"0123456789");
        let mut source = FileSource::open(&path).await.unwrap();
        assert_eq!(source.len(), 10);

        let (chunk, exhausted) = source.read(4).await.unwrap();
        assert_eq!(chunk.as_ref(), b"0123");
        assert!(!exhausted);

        let (chunk, exhausted) = source.read(4).await.unwrap();
        assert_eq!(chunk.as_ref(), b"4567");
        assert!(!exhausted);

        let (chunk, exhausted) = source.read(4).await.unwrap();
        assert_eq!(chunk.as_ref(), b"89");
        assert!(exhausted);

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn independent_handles_do_not_interfere() {
        let path = temp_file("handles", b"abcdefghij");
        let mut first = FileSource::open(&path).await.unwrap();
        let mut second = FileSource::open(&path).await.unwrap();

        first.skip(5);
        let (a, _) = first.read(2).await.unwrap();
        let (b, _) = second.read(2).await.unwrap();

        assert_eq!(a.as_ref(), b"fg");
        assert_eq!(b.as_ref(), b"ab");

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn read_after_close_fails() {
        let path = temp_file("close", b"abc");
        let mut source = FileSource::open(&path).await.unwrap();
        source.close().await.unwrap();

        assert!(source.read(1).await.is_err());

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = FileSource::open("/definitely/not/here.bin").await;
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }
}
