//! The response delivery core of butler.
//!
//! This crate turns a handler's logical [`response::Response`] into bytes on the wire. It
//! owns every part of delivery that has to be protocol precise:
//!
//! - `Cache-Control` rendering and policy precedence ([`cache`])
//! - ETag generation and `If-None-Match` short-circuiting to 304 ([`cache`])
//! - content encoding negotiation for gzip, deflate and brotli ([`codec`])
//! - range aware, chunked streaming over in-memory and file backed sources ([`stream`], [`source`])
//! - push style streaming where a handler writes chunks from many tasks ([`stream::HttpWriter`])
//!
//! The HTTP server itself is not part of this crate. Delivery only needs a [`transport::Transport`]:
//! something that accepts a status, headers and flushed chunks, and that can tell whether the
//! client went away. [`transport::channel`] provides one that produces an
//! `http::Response<ResponseBody>` suitable for any `http-body` based server.
//!
//! # Example
//!
//! ```no_run
//! use butler_http::protocol::RequestHeader;
//! use butler_http::response::{Delivery, Respond};
//! use butler_http::transport::channel;
//! use http::Request;
//!
//! # async fn run() {
//! let request: RequestHeader = Request::get("/hello").body(()).unwrap().into();
//! let (transport, pending) = channel();
//!
//! let response = Respond::ok().text("Hello World!");
//! let delivery = Delivery::default();
//!
//! let (result, response) =
//!     tokio::join!(delivery.deliver(response, &request, Box::new(transport)), pending.response());
//! assert!(result.is_ok());
//! assert_eq!(response.unwrap().status(), 200);
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: header collection, range parsing, request head, cookies and errors
//! - [`codec`]: encoders and the auto encoding decision policy
//! - [`cache`]: cache policy rendering and conditional request handling
//! - [`source`]: the seekable chunked [`source::ByteSource`] abstraction
//! - [`stream`]: the streaming engine and the push writer
//! - [`response`]: the logical response, canned constructors and the assembly pipeline
//! - [`transport`]: the transport seam and its channel implementation

pub mod cache;
pub mod codec;
pub mod protocol;
pub mod response;
pub mod source;
pub mod stream;
pub mod transport;

mod utils;
pub use utils::units;
