//! The logical response and its delivery.
//!
//! A handler builds a [`Response`] from one of the [`Respond`] constructors and chained setters.
//! [`Delivery`] applies the endpoint settings, cache policy and ETag handling, then the assembly
//! pipeline writes the response to a [`Transport`](crate::transport::Transport).

mod delivery;
pub use delivery::Delivery;

mod respond;
pub use respond::Respond;

mod send;
pub use send::Delivered;

use crate::cache::HttpCachePolicy;
use crate::codec::Encoding;
use crate::protocol::{self, BoxError, Cookie, Headers};
use crate::source::{ByteSource, FileSource, MemorySource};
use crate::stream::{HttpWriter, StreamingSettings, WriterFn};
use crate::transport::Transport;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::StatusCode;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::error;

/// A handler taking full control of the transport, nothing else of the response is applied.
pub type CustomHandler = Box<dyn FnOnce(Box<dyn Transport>) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// What a response sends as its body. Setting one mode replaces the others.
pub(crate) enum Payload {
    Empty,
    Body(Bytes),
    Reader(Box<dyn ByteSource>),
    Writer(WriterFn),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Body(body) => f.debug_tuple("Body").field(&body.len()).finish(),
            Self::Reader(source) => f.debug_tuple("Reader").field(&source.len()).finish(),
            Self::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// The pending outgoing message, consumed once by delivery.
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Headers,
    pub(crate) payload: Payload,
    pub(crate) encoding: Option<Encoding>,
    pub(crate) cache_policy: Option<HttpCachePolicy>,
    pub(crate) allow_streaming: bool,
    pub(crate) streaming_settings: Option<StreamingSettings>,
    pub(crate) etag: Option<String>,
    pub(crate) cookies: Vec<Cookie>,
    pub(crate) custom: Option<CustomHandler>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("payload", &self.payload)
            .field("encoding", &self.encoding)
            .field("cache_policy", &self.cache_policy)
            .field("allow_streaming", &self.allow_streaming)
            .field("streaming_settings", &self.streaming_settings)
            .field("etag", &self.etag)
            .field("cookies", &self.cookies)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            payload: Payload::Empty,
            encoding: None,
            cache_policy: None,
            allow_streaming: false,
            streaming_settings: None,
            etag: None,
            cookies: Vec::new(),
            custom: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// The buffered body, `None` when the response is empty or streamed.
    pub fn body(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Body(body) => Some(body),
            _ => None,
        }
    }

    /// True when the body comes from a byte source or a stream writer.
    pub fn is_streamed(&self) -> bool {
        matches!(self.payload, Payload::Reader(_) | Payload::Writer(_))
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Encoding for this response, it takes priority over the endpoint default.
    ///
    /// Encoding happens last, after every middleware ran. It does not occur when the client
    /// does not accept the coding or a `Content-Encoding` header is already set.
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Lets delivery promote a large buffered body, or one requested with `Range`, to a
    /// streamed range response.
    #[must_use]
    pub fn allow_streaming(mut self, allow: bool) -> Self {
        self.allow_streaming = allow;
        self
    }

    #[must_use]
    pub fn streaming_settings(mut self, settings: StreamingSettings) -> Self {
        self.streaming_settings = Some(settings);
        self
    }

    /// Uses `etag` instead of the body digest.
    #[must_use]
    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    #[must_use]
    pub fn cache_policy(mut self, policy: HttpCachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    /// Replaces every header.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    #[must_use]
    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Makes the client drop the cookie `name`.
    #[must_use]
    pub fn delete_cookie(mut self, name: impl Into<String>) -> Self {
        self.cookies.push(Cookie::removal(name));
        self
    }

    fn with_body(mut self, body: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        self.payload = Payload::Body(body.into());
        if let Some(content_type) = content_type {
            self.headers.set("Content-Type", content_type);
        }
        self
    }

    fn failed(mut self) -> Self {
        self.status = StatusCode::INTERNAL_SERVER_ERROR;
        self.payload = Payload::Empty;
        self
    }

    /// Serializes `data` to JSON. A serialization failure turns the response into a 500.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(self, data: &T) -> Self {
        match serde_json::to_vec(data) {
            Ok(body) => self.with_body(body, Some("application/json; charset=utf-8")),
            Err(e) => {
                error!(cause = %e, "failed to serialize response to JSON");
                self.failed()
            }
        }
    }

    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.with_body(text.into(), Some(mime::TEXT_PLAIN.as_ref()))
    }

    #[must_use]
    pub fn html(self, html: impl Into<String>) -> Self {
        self.with_body(html.into(), Some(mime::TEXT_HTML.as_ref()))
    }

    #[must_use]
    pub fn css(self, css: impl Into<String>) -> Self {
        self.with_body(css.into(), Some(mime::TEXT_CSS.as_ref()))
    }

    #[must_use]
    pub fn script(self, script: impl Into<String>) -> Self {
        self.with_body(script.into(), Some(mime::TEXT_JAVASCRIPT.as_ref()))
    }

    #[must_use]
    pub fn xml(self, xml: impl Into<String>) -> Self {
        self.with_body(xml.into(), Some(mime::TEXT_XML.as_ref()))
    }

    #[must_use]
    pub fn octet_stream(self, data: impl Into<Bytes>) -> Self {
        self.with_body(data, Some(mime::APPLICATION_OCTET_STREAM.as_ref()))
    }

    /// Binary body whose content type is detected from its first bytes.
    #[must_use]
    pub fn blob(self, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let content_type = protocol::mime::sniff(&data);
        self.with_body(data, Some(content_type))
    }

    /// Raw body, `Content-Type` is only set when given.
    #[must_use]
    pub fn bytes(self, data: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        self.with_body(data, content_type)
    }

    /// Reads the whole file into the body.
    ///
    /// The content type comes from the extension, or from the content when the extension is
    /// unknown. A read failure turns the response into a 500.
    pub async fn file(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(data) => {
                let content_type = protocol::mime::from_extension(path).unwrap_or_else(|| protocol::mime::sniff(&data));
                self.with_body(data, Some(content_type))
            }
            Err(e) => {
                error!(path = %path.display(), cause = %e, "unable to read file");
                self.failed()
            }
        }
    }

    /// Streams from `source` in chunks, honoring `Range` requests.
    #[must_use]
    pub fn stream(mut self, source: impl ByteSource + 'static, content_type: &str) -> Self {
        self.payload = Payload::Reader(Box::new(source));
        self.headers.set("Content-Type", content_type);
        self
    }

    /// Streams an in-memory buffer, see [`stream`](Response::stream).
    #[must_use]
    pub fn stream_bytes(self, data: impl Into<Bytes>, content_type: &str) -> Self {
        self.stream(MemorySource::new(data), content_type)
    }

    /// Streams a file, see [`stream`](Response::stream). Failing to open it turns the response
    /// into a 500.
    pub async fn stream_file(self, path: impl AsRef<Path>, content_type: &str) -> Self {
        let path = path.as_ref();
        match FileSource::open(path).await {
            Ok(source) => self.stream(source, content_type),
            Err(e) => {
                error!(path = %path.display(), cause = %e, "failed to open file for streaming");
                self.failed()
            }
        }
    }

    /// Sends the body in chunks pushed by `handler` through an [`HttpWriter`].
    ///
    /// Every write is flushed, the client can process parts of the response while the rest is
    /// still produced. The writer may be cloned and used from several tasks in parallel.
    #[must_use]
    pub fn stream_writer<F, Fut>(mut self, handler: F) -> Self
    where
        F: FnOnce(HttpWriter) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.payload = Payload::Writer(Box::new(move |writer| handler(writer).boxed()));
        self
    }

    /// Drops the body of any kind and the custom handler: what is left is a bodyless 304.
    pub(crate) fn into_not_modified(mut self) -> Self {
        self.status = StatusCode::NOT_MODIFIED;
        self.payload = Payload::Empty;
        self.custom = None;
        self
    }
}
