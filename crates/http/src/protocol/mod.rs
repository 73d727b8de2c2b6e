//! Protocol level building blocks used by the delivery pipeline.
//!
//! - [`Headers`]: the case-insensitive, multi-value header collection carried by a response
//! - [`HeaderSink`]: anything the collection can be merged into, `http::HeaderMap` included
//! - [`Range`] and [`parse_range`]: single byte-range parsing of the `Range` request header
//! - [`RequestHeader`]: the read-only view of the inbound request
//! - [`Cookie`]: outbound `Set-Cookie` values
//! - [`mime`]: content type detection by extension and by sniffing
//! - errors: [`RangeError`], [`SendError`] and [`DeliveryError`]

mod headers;
pub use headers::HeaderSink;
pub use headers::Headers;

mod range;
pub use range::Range;
pub use range::parse_range;

mod request;
pub use request::RequestHeader;

mod cookie;
pub use cookie::Cookie;
pub use cookie::SameSite;

pub mod mime;

mod error;
pub use error::BoxError;
pub use error::DeliveryError;
pub use error::RangeError;
pub use error::SendError;
