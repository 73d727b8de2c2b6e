//! Read-only view of the inbound request as seen by the delivery pipeline.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// The head of the inbound request: method, uri and headers.
///
/// Header lookups through [`RequestHeader::header`] return the last value when a name was
/// sent more than once, matching the response side [`Headers`](crate::protocol::Headers).
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the last value sent under `name`, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get_all(name).iter().next_back().and_then(|value| value.to_str().ok())
    }

    /// Looks up a cookie sent by the client.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.inner
            .headers()
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// True for the retrieval method the cache semantics apply to.
    pub fn is_get(&self) -> bool {
        self.inner.method() == Method::GET
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
