use crate::protocol::{DeliveryError, HeaderSink, Range, RangeError, SendError, parse_range};
use crate::source::ByteSource;
use crate::stream::{StreamOutcome, StreamingSettings};
use crate::transport::Transport;
use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, error, trace, warn};

/// Streams `source` to `transport`, honoring the `Range` request header.
///
/// Without a range the whole source is sent with `status`, a requested range forces
/// `206 Partial Content`. Every response carries `Accept-Ranges`, `Connection`, `Keep-Alive`,
/// `Content-Length`, `Content-Range` and `Content-Type`. Bad requests are answered here and
/// reported as [`StreamOutcome::Rejected`]:
///
/// - malformed range or a start beyond the content: `400`
/// - several ranges, or a start after the end: `416` with `Content-Range: bytes */<len>`
///
/// The source is closed on every path.
pub async fn stream_range(
    transport: &mut dyn Transport,
    mut source: Box<dyn ByteSource>,
    status: StatusCode,
    content_type: Option<&str>,
    range_header: Option<&str>,
    settings: &StreamingSettings,
) -> Result<StreamOutcome, DeliveryError> {
    let result = send_range(transport, source.as_mut(), status, content_type, range_header, settings).await;

    if let Err(e) = source.close().await {
        warn!(cause = %e, "failed to close byte source");
    }

    result
}

async fn send_range(
    transport: &mut dyn Transport,
    source: &mut dyn ByteSource,
    status: StatusCode,
    content_type: Option<&str>,
    range_header: Option<&str>,
    settings: &StreamingSettings,
) -> Result<StreamOutcome, DeliveryError> {
    let len = source.len();

    let requested = match parse_range(range_header) {
        Ok(requested) => requested,
        Err(RangeError::MultipleRanges) => {
            debug!(range = range_header, "multiple ranges requested");
            return reject(transport, StatusCode::RANGE_NOT_SATISFIABLE, Some(len)).await;
        }
        Err(e) => {
            debug!(range = range_header, cause = %e, "malformed range header");
            return reject(transport, StatusCode::BAD_REQUEST, None).await;
        }
    };

    if settings.chunk_size == 0 {
        error!("streaming chunk size must not be zero");
        transport.send_full(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new()).await?;
        return Err(DeliveryError::Misuse("streaming chunk size must not be zero"));
    }

    let headers = transport.headers_mut();
    headers.set("Accept-Ranges", "bytes");
    headers.set("Connection", "keep-alive");
    headers.set("Keep-Alive", &settings.keep_alive_header());
    if let Some(content_type) = content_type {
        headers.set("Content-Type", content_type);
    }

    if len == 0 {
        headers.set("Content-Length", "0");
        transport.send_full(status, Bytes::new()).await?;
        return Ok(StreamOutcome::Completed { sent: 0 });
    }

    let (status, range) = match requested {
        Some(range) => (StatusCode::PARTIAL_CONTENT, range),
        None => (status, Range::full(len)),
    };

    if range.start.is_some_and(|start| start >= len) {
        debug!(range = range_header, len, "range starts beyond the content");
        return reject(transport, StatusCode::BAD_REQUEST, None).await;
    }

    let Some((start, end)) = range.resolve(len) else {
        debug!(range = range_header, len, "range is not satisfiable");
        return reject(transport, StatusCode::RANGE_NOT_SATISFIABLE, Some(len)).await;
    };

    let requested_len = end - start + 1;
    let headers = transport.headers_mut();
    headers.set("Content-Length", &requested_len.to_string());
    headers.set("Content-Range", &format!("bytes {start}-{end}/{len}"));

    if source.skip(start) {
        return reject(transport, StatusCode::BAD_REQUEST, None).await;
    }

    transport.send_head(status).await?;
    trace!(%status, start, end, len, "streaming range");

    let chunk_size = settings.chunk_size as u64;
    let chunked = requested_len > chunk_size;
    let mut sent = 0;

    while sent < requested_len {
        if chunked && transport.is_closed() {
            debug!(sent, requested_len, "client disconnected, stop streaming");
            return Ok(StreamOutcome::Aborted { sent });
        }

        // bounded by chunk_size, which is a usize
        let next = usize::try_from(chunk_size.min(requested_len - sent)).unwrap_or(settings.chunk_size);
        let (chunk, exhausted) = source.read(next).await.inspect_err(|e| {
            error!(cause = %e, sent, "failed to read from byte source");
        })?;

        let chunk_len = chunk.len() as u64;
        if let Err(e) = write_and_flush(transport, chunk).await {
            if e.is_closed() {
                debug!(sent, requested_len, "client disconnected, stop streaming");
                return Ok(StreamOutcome::Aborted { sent });
            }
            error!(cause = %e, sent, "failed to write streamed chunk");
            return Err(e.into());
        }

        sent += chunk_len;
        trace!(sent, requested_len, "flushed chunk");

        if exhausted || chunk_len == 0 {
            break;
        }
    }

    if sent < requested_len {
        warn!(sent, requested_len, "byte source ended before the requested range");
    }

    Ok(StreamOutcome::Completed { sent })
}

async fn write_and_flush(transport: &mut dyn Transport, chunk: Bytes) -> Result<(), SendError> {
    transport.write(chunk).await?;
    transport.flush().await
}

async fn reject(
    transport: &mut dyn Transport,
    status: StatusCode,
    unsatisfied_len: Option<u64>,
) -> Result<StreamOutcome, DeliveryError> {
    let headers = transport.headers_mut();
    for name in ["Content-Length", "Content-Range", "Content-Type", "Content-Encoding"] {
        headers.del(name);
    }
    if let Some(len) = unsatisfied_len {
        headers.set("Content-Range", &format!("bytes */{len}"));
    }

    transport.send_full(status, Bytes::new()).await?;
    Ok(StreamOutcome::Rejected { status })
}

#[cfg(test)]
mod tests {
    use super::stream_range;
    use crate::protocol::SendError;
    use crate::source::{ByteSource, MemorySource};
    use crate::stream::{StreamOutcome, StreamingSettings};
    use crate::transport::Transport;
    use async_trait::async_trait;
    use bytes::{Bytes, BytesMut};
    use http::{HeaderMap, StatusCode};
    use std::io;

    /// Records everything written, optionally reporting a disconnect after some writes.
    #[derive(Default)]
    struct RecordingTransport {
        headers: HeaderMap,
        status: Option<StatusCode>,
        body: BytesMut,
        writes: usize,
        flushes: usize,
        close_after: Option<usize>,
    }

    impl RecordingTransport {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).map(|value| value.to_str().unwrap())
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        async fn send_head(&mut self, status: StatusCode) -> Result<(), SendError> {
            self.status = Some(status);
            Ok(())
        }

        async fn write(&mut self, chunk: Bytes) -> Result<(), SendError> {
            if self.is_closed() {
                return Err(SendError::Closed);
            }
            self.writes += 1;
            self.body.extend_from_slice(&chunk);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), SendError> {
            self.flushes += 1;
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.close_after.is_some_and(|limit| self.writes >= limit)
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ByteSource for FailingSource {
        async fn read(&mut self, _up_to: usize) -> io::Result<(Bytes, bool)> {
            Err(io::Error::other("disk on fire"))
        }

        fn skip(&mut self, _n: u64) -> bool {
            false
        }

        fn len(&self) -> u64 {
            100
        }

        fn position(&self) -> u64 {
            0
        }
    }

    fn body_185() -> Bytes {
        (0..185u8).collect::<Vec<_>>().into()
    }

    async fn run(
        transport: &mut RecordingTransport,
        data: Bytes,
        range: Option<&str>,
        settings: StreamingSettings,
    ) -> StreamOutcome {
        stream_range(transport, Box::new(MemorySource::new(data)), StatusCode::OK, Some("video/mp4"), range, &settings)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn leading_range() {
        let mut transport = RecordingTransport::default();
        let outcome = run(&mut transport, body_185(), Some("bytes=0-31"), StreamingSettings::default()).await;

        assert_eq!(outcome, StreamOutcome::Completed { sent: 32 });
        assert_eq!(transport.status, Some(StatusCode::PARTIAL_CONTENT));
        assert_eq!(transport.header("content-range"), Some("bytes 0-31/185"));
        assert_eq!(transport.header("content-length"), Some("32"));
        assert_eq!(transport.header("accept-ranges"), Some("bytes"));
        assert_eq!(transport.header("connection"), Some("keep-alive"));
        assert_eq!(transport.header("keep-alive"), Some("timeout=5, max=1000"));
        assert_eq!(transport.header("content-type"), Some("video/mp4"));
        assert_eq!(transport.body.as_ref(), &body_185()[..32]);
    }

    #[tokio::test]
    async fn open_ended_range() {
        let mut transport = RecordingTransport::default();
        run(&mut transport, body_185(), Some("bytes=96-"), StreamingSettings::default()).await;

        assert_eq!(transport.header("content-range"), Some("bytes 96-184/185"));
        assert_eq!(transport.header("content-length"), Some("89"));
        assert_eq!(transport.body.as_ref(), &body_185()[96..]);
    }

    #[tokio::test]
    async fn no_range_sends_everything_with_original_status() {
        let mut transport = RecordingTransport::default();
        let outcome = run(&mut transport, body_185(), None, StreamingSettings::default()).await;

        assert_eq!(outcome, StreamOutcome::Completed { sent: 185 });
        assert_eq!(transport.status, Some(StatusCode::OK));
        assert_eq!(transport.header("content-range"), Some("bytes 0-184/185"));
        assert_eq!(transport.header("content-length"), Some("185"));
        assert_eq!(transport.body.as_ref(), body_185().as_ref());
    }

    #[tokio::test]
    async fn end_is_clamped_to_the_content() {
        let mut transport = RecordingTransport::default();
        run(&mut transport, body_185(), Some("bytes=180-1000"), StreamingSettings::default()).await;

        assert_eq!(transport.header("content-range"), Some("bytes 180-184/185"));
        assert_eq!(transport.body.as_ref(), &body_185()[180..]);
    }

    #[tokio::test]
    async fn chunks_are_flushed_one_by_one() {
        let mut transport = RecordingTransport::default();
        let settings = StreamingSettings::default().chunk_size(50);
        let outcome = run(&mut transport, body_185(), None, settings).await;

        assert_eq!(outcome, StreamOutcome::Completed { sent: 185 });
        assert_eq!(transport.writes, 4);
        assert_eq!(transport.flushes, 4);
        assert_eq!(transport.body.as_ref(), body_185().as_ref());
    }

    #[tokio::test]
    async fn chunk_of_len_minus_one_keeps_the_last_byte() {
        let mut transport = RecordingTransport::default();
        let settings = StreamingSettings::default().chunk_size(184);
        run(&mut transport, body_185(), None, settings).await;

        assert_eq!(transport.writes, 2);
        assert_eq!(transport.body.as_ref(), body_185().as_ref());
    }

    #[tokio::test]
    async fn disconnect_stops_silently() {
        let mut transport = RecordingTransport { close_after: Some(2), ..Default::default() };
        let settings = StreamingSettings::default().chunk_size(10);
        let outcome = run(&mut transport, body_185(), None, settings).await;

        assert_eq!(outcome, StreamOutcome::Aborted { sent: 20 });
        assert_eq!(transport.body.as_ref(), &body_185()[..20]);
    }

    #[tokio::test]
    async fn malformed_range_is_bad_request() {
        let mut transport = RecordingTransport::default();
        let outcome = run(&mut transport, body_185(), Some("bytes=abc-"), StreamingSettings::default()).await;

        assert_eq!(outcome, StreamOutcome::Rejected { status: StatusCode::BAD_REQUEST });
        assert_eq!(transport.status, Some(StatusCode::BAD_REQUEST));
        assert!(transport.body.is_empty());
    }

    #[tokio::test]
    async fn start_beyond_content_is_bad_request() {
        let mut transport = RecordingTransport::default();
        let outcome = run(&mut transport, body_185(), Some("bytes=185-"), StreamingSettings::default()).await;

        assert_eq!(outcome, StreamOutcome::Rejected { status: StatusCode::BAD_REQUEST });
        assert!(transport.header("content-range").is_none());
        assert!(transport.header("content-length").is_none());
    }

    #[tokio::test]
    async fn inverted_and_multiple_ranges_are_not_satisfiable() {
        for range in ["bytes=50-10", "bytes=0-10,20-30"] {
            let mut transport = RecordingTransport::default();
            let outcome = run(&mut transport, body_185(), Some(range), StreamingSettings::default()).await;

            assert_eq!(outcome, StreamOutcome::Rejected { status: StatusCode::RANGE_NOT_SATISFIABLE });
            assert_eq!(transport.header("content-range"), Some("bytes */185"));
        }
    }

    #[tokio::test]
    async fn empty_source_sends_headers_only() {
        let mut transport = RecordingTransport::default();
        let outcome = run(&mut transport, Bytes::new(), None, StreamingSettings::default()).await;

        assert_eq!(outcome, StreamOutcome::Completed { sent: 0 });
        assert_eq!(transport.status, Some(StatusCode::OK));
        assert_eq!(transport.header("content-length"), Some("0"));
        assert_eq!(transport.writes, 0);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_misuse() {
        let mut transport = RecordingTransport::default();
        let settings = StreamingSettings::default().chunk_size(0);
        let result = stream_range(
            &mut transport,
            Box::new(MemorySource::new(body_185())),
            StatusCode::OK,
            None,
            None,
            &settings,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(transport.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn read_errors_propagate() {
        let mut transport = RecordingTransport::default();
        let result =
            stream_range(&mut transport, Box::new(FailingSource), StatusCode::OK, None, None, &StreamingSettings::default())
                .await;

        assert!(result.is_err());
        assert_eq!(transport.status, Some(StatusCode::OK));
    }
}
