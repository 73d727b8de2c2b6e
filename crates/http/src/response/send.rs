//! The response assembly pipeline.
//!
//! Order matters and is fixed: custom handler, `Accept-Ranges`, cookies, encoding, header copy,
//! then exactly one of push writer, byte source, buffered body (possibly promoted to a range
//! stream) or headers only.

use crate::codec::CodecConfig;
use crate::protocol::{DeliveryError, HeaderSink, RequestHeader};
use crate::response::{Payload, Response};
use crate::source::MemorySource;
use crate::stream::{StreamOutcome, stream_range, stream_writer};
use crate::transport::Transport;
use crate::units::MB;
use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, error};

/// Buffered bodies from this size on are streamed when the response allows it.
const AUTO_STREAM_MIN_SIZE: usize = 10 * MB;

/// How a response left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivered {
    /// A custom handler wrote the response.
    Custom,
    /// Sent in one piece, `len` body bytes.
    Buffered { status: StatusCode, len: u64 },
    /// The `If-None-Match` header matched, a bodyless 304 was sent.
    NotModified,
    /// Sent by the streaming engine.
    Streamed(StreamOutcome),
}

pub(crate) async fn send(
    response: Response,
    request: &RequestHeader,
    mut transport: Box<dyn Transport>,
    codec: &CodecConfig,
) -> Result<Delivered, DeliveryError> {
    let Response { status, mut headers, mut payload, encoding, allow_streaming, streaming_settings, cookies, custom, .. } =
        response;

    if let Some(custom) = custom {
        custom(transport).await.map_err(|e| {
            error!(cause = %e, "custom response handler failed");
            DeliveryError::Handler(e)
        })?;
        return Ok(Delivered::Custom);
    }

    if allow_streaming {
        headers.set("Accept-Ranges", "bytes");
    }

    for cookie in &cookies {
        transport.set_cookie(cookie);
    }

    if let Payload::Body(body) = &mut payload {
        codec.apply(encoding.unwrap_or_default(), &mut headers, body, request.header("Accept-Encoding"));
    }

    headers.copy_into(transport.headers_mut());

    let settings = streaming_settings.unwrap_or_default();
    let content_type = headers.get("Content-Type");

    match payload {
        Payload::Writer(handler) => {
            stream_writer(transport, status, content_type, &settings, handler).await.map(Delivered::Streamed)
        }
        Payload::Reader(source) => {
            stream_range(transport.as_mut(), source, status, content_type, request.header("Range"), &settings)
                .await
                .map(Delivered::Streamed)
        }
        Payload::Body(body) if !body.is_empty() => {
            if should_auto_stream(allow_streaming, status, request, &body) {
                debug!(len = body.len(), "promoting buffered body to a range stream");
                let source = Box::new(MemorySource::new(body));
                return stream_range(transport.as_mut(), source, status, content_type, request.header("Range"), &settings)
                    .await
                    .map(Delivered::Streamed);
            }

            let len = body.len() as u64;
            transport.headers_mut().set("Content-Length", &len.to_string());
            transport.send_full(status, body).await?;
            Ok(Delivered::Buffered { status, len })
        }
        Payload::Body(_) | Payload::Empty => {
            transport.send_full(status, Bytes::new()).await?;
            Ok(Delivered::Buffered { status, len: 0 })
        }
    }
}

fn should_auto_stream(allow_streaming: bool, status: StatusCode, request: &RequestHeader, body: &Bytes) -> bool {
    allow_streaming
        && status.as_u16() < 300
        && (request.header("Range").is_some_and(|range| !range.is_empty()) || body.len() >= AUTO_STREAM_MIN_SIZE)
}

#[cfg(test)]
mod tests {
    use super::{AUTO_STREAM_MIN_SIZE, should_auto_stream};
    use crate::protocol::RequestHeader;
    use bytes::Bytes;
    use http::{Request, StatusCode};

    fn head(range: Option<&str>) -> RequestHeader {
        let mut builder = Request::get("/report");
        if let Some(range) = range {
            builder = builder.header("Range", range);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn range_header_promotes_small_bodies() {
        let body = Bytes::from_static(b"0123456789");
        assert!(should_auto_stream(true, StatusCode::OK, &head(Some("bytes=0-3")), &body));
        assert!(!should_auto_stream(false, StatusCode::OK, &head(Some("bytes=0-3")), &body));
        assert!(!should_auto_stream(true, StatusCode::FOUND, &head(Some("bytes=0-3")), &body));
    }

    #[test]
    fn empty_range_header_is_no_range() {
        let body = Bytes::from_static(b"0123456789");
        assert!(!should_auto_stream(true, StatusCode::OK, &head(Some("")), &body));
        assert!(!should_auto_stream(true, StatusCode::OK, &head(None), &body));
    }

    #[test]
    fn large_bodies_are_promoted_without_range() {
        let body = Bytes::from(vec![0u8; AUTO_STREAM_MIN_SIZE]);
        assert!(should_auto_stream(true, StatusCode::OK, &head(None), &body));
        assert!(!should_auto_stream(true, StatusCode::OK, &head(None), &body.slice(1..)));
    }
}
