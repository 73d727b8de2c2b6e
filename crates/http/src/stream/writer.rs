use crate::protocol::{BoxError, DeliveryError, HeaderSink};
use crate::stream::{StreamOutcome, StreamingSettings};
use crate::transport::Transport;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// A push-style streaming handler, it receives the writer of the response.
pub type WriterFn = Box<dyn FnOnce(HttpWriter) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

struct WriterState {
    transport: Box<dyn Transport>,
    sent: u64,
    closed: bool,
}

/// Writes chunks straight to the client, each write is flushed immediately.
///
/// Clones share one transport behind a lock, so concurrent tasks may write to the same response
/// and every chunk goes out whole.
#[derive(Clone)]
pub struct HttpWriter {
    state: Arc<Mutex<WriterState>>,
}

impl fmt::Debug for HttpWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpWriter").finish_non_exhaustive()
    }
}

impl HttpWriter {
    fn new(transport: Box<dyn Transport>) -> Self {
        Self { state: Arc::new(Mutex::new(WriterState { transport, sent: 0, closed: false })) }
    }

    /// Writes and flushes `data`.
    ///
    /// Returns `true` when the connection is closed, the data was not sent in that case. Write
    /// failures are logged and reported as a closed connection.
    pub async fn write(&self, data: impl Into<Bytes>) -> bool {
        let data = data.into();
        let mut state = self.state.lock().await;

        if state.closed || state.transport.is_closed() {
            state.closed = true;
            return true;
        }

        let len = data.len() as u64;
        let result = match state.transport.write(data).await {
            Ok(()) => state.transport.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                state.sent += len;
                false
            }
            Err(e) => {
                if !e.is_closed() {
                    error!(cause = %e, "failed to write to the response");
                }
                state.closed = true;
                true
            }
        }
    }

    /// Same as [`write`](HttpWriter::write) for text.
    pub async fn write_str(&self, data: &str) -> bool {
        self.write(Bytes::copy_from_slice(data.as_bytes())).await
    }

    /// Bytes written and flushed so far, by every clone.
    pub async fn sent(&self) -> u64 {
        self.state.lock().await.sent
    }

    /// True once the client went away.
    pub async fn is_closed(&self) -> bool {
        let state = self.state.lock().await;
        state.closed || state.transport.is_closed()
    }
}

/// Sends the head and runs the push-style `handler` against the response.
///
/// The response carries `Connection`, `Keep-Alive` and `Content-Type` but no length, the body
/// ends when the handler returns and every writer clone is dropped.
pub async fn stream_writer(
    mut transport: Box<dyn Transport>,
    status: StatusCode,
    content_type: Option<&str>,
    settings: &StreamingSettings,
    handler: WriterFn,
) -> Result<StreamOutcome, DeliveryError> {
    let headers = transport.headers_mut();
    headers.set("Connection", "keep-alive");
    headers.set("Keep-Alive", &settings.keep_alive_header());
    if let Some(content_type) = content_type {
        headers.set("Content-Type", content_type);
    }

    transport.send_head(status).await?;

    let writer = HttpWriter::new(transport);
    let result = handler(writer.clone()).await;
    let sent = writer.sent().await;
    let closed = writer.is_closed().await;

    if let Err(e) = result {
        error!(cause = %e, sent, "stream writer handler failed");
        return Err(DeliveryError::Handler(e));
    }

    if closed {
        debug!(sent, "client disconnected during push streaming");
        return Ok(StreamOutcome::Aborted { sent });
    }

    Ok(StreamOutcome::Completed { sent })
}
