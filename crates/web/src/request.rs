//! The inbound request as seen by auth handlers, middlewares and endpoint handlers.
//!
//! - [`Request`]: head, collected body, path parameters and request scoped extensions
//! - [`PathParams`]: named segments captured by the route pattern, e.g. `id` in `/users/{id}`

use crate::params::ParamError;
use butler_http::protocol::RequestHeader;
use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

/// One inbound request, body included.
#[derive(Debug)]
pub struct Request {
    head: RequestHeader,
    params: PathParams,
    body: Bytes,
    extensions: Extensions,
}

impl Request {
    pub fn new(head: RequestHeader, params: PathParams, body: Bytes) -> Self {
        Self { head, params, body, extensions: Extensions::new() }
    }

    /// The head handed to the delivery pipeline.
    pub fn head(&self) -> &RequestHeader {
        &self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn uri(&self) -> &Uri {
        self.head.uri()
    }

    pub fn path(&self) -> &str {
        self.head.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    /// Last value sent under `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.head.cookie(name)
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// The query string without the leading `?`.
    pub fn raw_query(&self) -> Option<&str> {
        self.head.uri().query()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Data attached by auth handlers and middlewares for the ones running after them.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Deserializes the query string, nested keys like `filter[name]=x` included.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, ParamError> {
        Ok(serde_qs::from_str(self.raw_query().unwrap_or_default())?)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ParamError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn form<T: DeserializeOwned>(&self) -> Result<T, ParamError> {
        Ok(serde_urlencoded::from_bytes(&self.body)?)
    }
}

/// Path parameters captured by the matched route, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The raw, still percent-encoded, value of the parameter `key`.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.entries.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl From<matchit::Params<'_, '_>> for PathParams {
    fn from(params: matchit::Params<'_, '_>) -> Self {
        Self { entries: params.iter().map(|(name, value)| (name.to_owned(), value.to_owned())).collect() }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect() }
    }
}
