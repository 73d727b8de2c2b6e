//! Streaming delivery.
//!
//! [`stream_range`] pulls a [`ByteSource`](crate::source::ByteSource) in chunks, honoring the
//! `Range` request header: headers first, then one flushed write per chunk until the requested
//! range is sent or the client disconnects. [`stream_writer`] hands an [`HttpWriter`] to the
//! handler instead, which pushes chunks itself, possibly from several tasks at once.

mod range;
pub use range::stream_range;

mod writer;
pub use writer::HttpWriter;
pub use writer::WriterFn;
pub use writer::stream_writer;

use crate::units::KB;
use http::StatusCode;

/// Chunking and keep-alive parameters of a streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingSettings {
    /// Largest chunk read from the source and written in one flush.
    pub chunk_size: usize,
    /// Seconds advertised in the `Keep-Alive` timeout parameter.
    pub keep_alive_timeout: u64,
    /// Requests advertised in the `Keep-Alive` max parameter.
    pub keep_alive_max: u64,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self { chunk_size: 256 * KB, keep_alive_timeout: 5, keep_alive_max: 1000 }
    }
}

impl StreamingSettings {
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn keep_alive(mut self, timeout: u64, max: u64) -> Self {
        self.keep_alive_timeout = timeout;
        self.keep_alive_max = max;
        self
    }

    /// Value of the `Keep-Alive` response header.
    pub fn keep_alive_header(&self) -> String {
        format!("timeout={}, max={}", self.keep_alive_timeout, self.keep_alive_max)
    }
}

/// How a streamed delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every requested byte was written and flushed.
    Completed { sent: u64 },
    /// The client went away, `sent` bytes reached the transport before that.
    Aborted { sent: u64 },
    /// The request could not be served, a bodyless response with `status` was sent instead.
    Rejected { status: StatusCode },
}
