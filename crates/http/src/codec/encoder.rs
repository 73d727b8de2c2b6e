//! One-shot body compression.
//!
//! Every encoder writes into an in-memory [`Writer`] and is finished right away, the compressed
//! body replaces the buffered one.

use crate::codec::ContentCoding;
use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use std::io;
use std::io::Write;
use tracing::trace;

const BROTLI_BUFFER_SIZE: usize = 32 * 1024;
const BROTLI_QUALITY: u32 = 3;
const BROTLI_LGWIN: u32 = 22;

pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity) }
    }

    fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum Encoder {
    Gzip(GzEncoder<Writer>),
    Deflate(ZlibEncoder<Writer>),
    Br(Box<brotli::CompressorWriter<Writer>>),
}

impl Encoder {
    fn new(coding: ContentCoding, capacity: usize) -> Self {
        let writer = Writer::with_capacity(capacity);
        match coding {
            ContentCoding::Gzip => Self::Gzip(GzEncoder::new(writer, Compression::default())),
            ContentCoding::Deflate => Self::Deflate(ZlibEncoder::new(writer, Compression::default())),
            ContentCoding::Br => Self::Br(Box::new(brotli::CompressorWriter::new(
                writer,
                BROTLI_BUFFER_SIZE,
                BROTLI_QUALITY,
                BROTLI_LGWIN,
            ))),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let result = match self {
            Self::Gzip(encoder) => encoder.write_all(data),
            Self::Deflate(encoder) => encoder.write_all(data),
            Self::Br(encoder) => encoder.write_all(data),
        };

        if let Err(e) = &result {
            trace!(cause = %e, "error while compressing body");
        }
        result
    }

    fn finish(self) -> io::Result<Bytes> {
        let writer = match self {
            Self::Gzip(encoder) => encoder.finish()?,
            Self::Deflate(encoder) => encoder.finish()?,
            Self::Br(encoder) => encoder.into_inner(),
        };
        Ok(writer.freeze())
    }
}

/// Compresses `data` with `coding` and returns the complete encoded body.
pub fn encode(coding: ContentCoding, data: &[u8]) -> io::Result<Bytes> {
    // compressed output is usually well below the input size
    let mut encoder = Encoder::new(coding, data.len() / 2 + 64);
    encoder.write(data)?;
    encoder.finish()
}
