//! The seam between delivery and the HTTP server.
//!
//! Delivery writes through a [`Transport`]: an outbound header map, a status line, flushed body
//! chunks and a way to learn that the client went away. [`channel`] builds a transport whose
//! output is an `http::Response<ResponseBody>`, ready for any `http-body` based server.

mod body;
pub use body::ResponseBody;

mod channel;
pub use channel::ChannelTransport;
pub use channel::PendingResponse;
pub use channel::channel;

use crate::protocol::{Cookie, SendError};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::warn;

/// Outbound half of one HTTP exchange.
///
/// Headers must be complete before [`send_head`](Transport::send_head) or
/// [`send_full`](Transport::send_full) is called, later changes are not transmitted.
#[async_trait]
pub trait Transport: Send {
    /// The header sink of the outgoing response.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Appends a `Set-Cookie` header.
    fn set_cookie(&mut self, cookie: &Cookie) {
        match HeaderValue::from_str(&cookie.to_header_value()) {
            Ok(value) => {
                self.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(cookie = %cookie.name, cause = %e, "skip cookie with invalid value"),
        }
    }

    /// Sends status and headers, the body follows through [`write`](Transport::write).
    async fn send_head(&mut self, status: StatusCode) -> Result<(), SendError>;

    /// Sends a complete response with a buffered, possibly empty, body.
    async fn send_full(&mut self, status: StatusCode, body: Bytes) -> Result<(), SendError> {
        self.send_head(status).await?;
        if !body.is_empty() {
            self.write(body).await?;
            self.flush().await?;
        }
        Ok(())
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), SendError>;

    async fn flush(&mut self) -> Result<(), SendError>;

    /// True once the client disconnected.
    fn is_closed(&self) -> bool;
}
