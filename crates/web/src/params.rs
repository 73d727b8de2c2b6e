//! Typed binding of endpoint parameters and bodies.
//!
//! Parameters come from the path parameters merged with the query string, bodies from the
//! collected request body according to its `Content-Type`. Any failure answers 400.

use crate::request::Request;
use butler_http::response::{Respond, Response};
use serde::de::{self, Deserialize, DeserializeOwned, Deserializer, IgnoredAny, MapAccess, Visitor};
use std::fmt;
use thiserror::Error;

/// Parameter or body type of endpoints that take none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoParams;

impl<'de> Deserialize<'de> for NoParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NoParamsVisitor)
    }
}

/// Reads a map and drops every entry: query strings and forms are maps at the top level.
struct NoParamsVisitor;

impl<'de> Visitor<'de> for NoParamsVisitor {
    type Value = NoParams;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of ignored entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<NoParams, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(NoParams)
    }

    fn visit_unit<E: de::Error>(self) -> Result<NoParams, E> {
        Ok(NoParams)
    }
}

#[derive(Error, Debug)]
pub enum ParamError {
    #[error("invalid parameters: {source}")]
    Query {
        #[from]
        source: serde_qs::Error,
    },

    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid form body: {source}")]
    Form {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("cannot encode path parameters: {source}")]
    PathParams {
        #[from]
        source: serde_urlencoded::ser::Error,
    },

    #[error("unsupported body content type: {0:?}")]
    UnsupportedContentType(Option<String>),
}

impl ParamError {
    /// The 400 answer, with a short text body that does not leak the cause.
    pub fn to_response(&self) -> Response {
        let message = match self {
            Self::Query { .. } | Self::PathParams { .. } => "invalid parameters",
            Self::Json { .. } | Self::Form { .. } => "invalid request body",
            Self::UnsupportedContentType(_) => "unsupported request body content type",
        };
        Respond::bad_request().text(message)
    }
}

/// Binds path parameters and the query string into `P`. Path parameters come first.
pub fn bind_params<P: DeserializeOwned>(request: &Request) -> Result<P, ParamError> {
    let mut query = serde_urlencoded::to_string(request.params().iter().collect::<Vec<_>>())?;

    if let Some(raw) = request.raw_query().filter(|raw| !raw.is_empty()) {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(raw);
    }

    Ok(serde_qs::from_str(&query)?)
}

/// Binds the request body into `B`, JSON or url-encoded form by `Content-Type`.
///
/// An empty body binds like an empty form, so types with only optional fields and
/// [`NoParams`] accept it.
pub fn bind_body<B: DeserializeOwned>(request: &Request) -> Result<B, ParamError> {
    if request.body().is_empty() {
        return Ok(serde_urlencoded::from_bytes(b"")?);
    }

    match request.header("Content-Type") {
        Some(content_type) if content_type.starts_with(mime::APPLICATION_JSON.as_ref()) => request.json(),
        Some(content_type) if content_type.starts_with(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()) => request.form(),
        other => Err(ParamError::UnsupportedContentType(other.map(str::to_owned))),
    }
}

#[cfg(test)]
mod tests {
    use super::{NoParams, ParamError, bind_body, bind_params};
    use crate::request::Request;
    use bytes::Bytes;
    use http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct UserParams {
        id: u64,
        verbose: Option<bool>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
        age: u8,
    }

    fn post(uri: &str, params: &[(&str, &str)], content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::post(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let head = builder.body(()).unwrap().into();
        Request::new(head, params.iter().copied().collect(), Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn path_params_merge_with_query() {
        let request = post("/users/5?verbose=true", &[("id", "5")], None, "");
        let params: UserParams = bind_params(&request).unwrap();
        assert_eq!(params, UserParams { id: 5, verbose: Some(true) });
    }

    #[test]
    fn missing_param_is_bad_request() {
        let request = post("/users", &[], None, "");
        let error = bind_params::<UserParams>(&request).unwrap_err();
        assert!(matches!(error, ParamError::Query { .. }));

        let response = error.to_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body().unwrap().as_ref(), b"invalid parameters");
    }

    #[test]
    fn no_params_accepts_anything() {
        let request = post("/x?a=1&b=2", &[("id", "1")], None, "");
        assert_eq!(bind_params::<NoParams>(&request).unwrap(), NoParams);
        assert_eq!(bind_body::<NoParams>(&request).unwrap(), NoParams);

        let path_only = post("/users/7", &[("id", "7")], None, "");
        assert_eq!(bind_params::<NoParams>(&path_only).unwrap(), NoParams);

        let json = post("/", &[], Some("application/json"), r#"{"ignored":[1,2,{"deep":true}]}"#);
        assert_eq!(bind_body::<NoParams>(&json).unwrap(), NoParams);

        let form = post("/", &[], Some("application/x-www-form-urlencoded"), "a=1&b=2");
        assert_eq!(bind_body::<NoParams>(&form).unwrap(), NoParams);
    }

    #[test]
    fn body_by_content_type() {
        let json = post("/", &[], Some("application/json; charset=utf-8"), r#"{"name":"ada","age":36}"#);
        assert_eq!(bind_body::<NewUser>(&json).unwrap(), NewUser { name: "ada".into(), age: 36 });

        let form = post("/", &[], Some("application/x-www-form-urlencoded"), "name=grace&age=45");
        assert_eq!(bind_body::<NewUser>(&form).unwrap(), NewUser { name: "grace".into(), age: 45 });
    }

    #[test]
    fn body_errors() {
        let unknown = post("/", &[], Some("text/plain"), "hello");
        assert!(matches!(bind_body::<NewUser>(&unknown), Err(ParamError::UnsupportedContentType(Some(_)))));

        let broken = post("/", &[], Some("application/json"), "{\"name\":");
        let error = bind_body::<NewUser>(&broken).unwrap_err();
        assert_eq!(error.to_response().body().unwrap().as_ref(), b"invalid request body");

        let empty = post("/", &[], Some("application/json"), "");
        assert!(bind_body::<NewUser>(&empty).is_err());
    }
}
