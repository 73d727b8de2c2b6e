use crate::protocol::SendError;
use crate::transport::{ResponseBody, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::{mpsc, oneshot};
use futures::{SinkExt, StreamExt};
use http::{HeaderMap, Response, StatusCode};
use http_body::Frame;
use http_body_util::StreamBody;
use tracing::trace;

/// How many written chunks may wait in the channel before a writer has to wait.
const BODY_BUFFER: usize = 4;

/// Creates a connected transport and the response it produces.
pub fn channel() -> (ChannelTransport, PendingResponse) {
    let (head_sender, head_receiver) = oneshot::channel();
    let transport = ChannelTransport { headers: HeaderMap::new(), head: Some(head_sender), body: None };
    (transport, PendingResponse { head: head_receiver })
}

/// A [`Transport`] handing its output to a [`PendingResponse`].
///
/// The head travels through a oneshot channel, body chunks through a bounded channel whose
/// receiving side is the streamed [`ResponseBody`]. Dropping that body closes the transport.
#[derive(Debug)]
pub struct ChannelTransport {
    headers: HeaderMap,
    head: Option<oneshot::Sender<Response<ResponseBody>>>,
    body: Option<mpsc::Sender<Bytes>>,
}

impl ChannelTransport {
    fn take_head(&mut self) -> Result<oneshot::Sender<Response<ResponseBody>>, SendError> {
        self.head.take().ok_or_else(|| SendError::io(std::io::Error::other("response head already sent")))
    }

    fn build(&mut self, status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        response
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    async fn send_head(&mut self, status: StatusCode) -> Result<(), SendError> {
        let head = self.take_head()?;
        let (sender, receiver) = mpsc::channel::<Bytes>(BODY_BUFFER);
        let body = StreamBody::new(receiver.map(|chunk| Ok::<_, SendError>(Frame::data(chunk))));

        let response = self.build(status, ResponseBody::stream(body));
        head.send(response).map_err(|_unsent| SendError::Closed)?;
        self.body = Some(sender);
        trace!(%status, "sent streaming response head");
        Ok(())
    }

    async fn send_full(&mut self, status: StatusCode, body: Bytes) -> Result<(), SendError> {
        let head = self.take_head()?;
        let response = self.build(status, ResponseBody::once(body));
        head.send(response).map_err(|_unsent| SendError::Closed)?;
        trace!(%status, "sent buffered response");
        Ok(())
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), SendError> {
        let Some(sender) = self.body.as_mut() else {
            return Err(SendError::io(std::io::Error::other("write before response head")));
        };
        sender.feed(chunk).await.map_err(|_disconnected| SendError::Closed)
    }

    async fn flush(&mut self) -> Result<(), SendError> {
        match self.body.as_mut() {
            Some(sender) => sender.flush().await.map_err(|_disconnected| SendError::Closed),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        match (&self.head, &self.body) {
            (Some(head), _) => head.is_canceled(),
            (None, Some(body)) => body.is_closed(),
            (None, None) => false,
        }
    }
}

/// The response a [`ChannelTransport`] is going to produce.
#[derive(Debug)]
pub struct PendingResponse {
    head: oneshot::Receiver<Response<ResponseBody>>,
}

impl PendingResponse {
    /// Resolves once the head was sent. Fails when the transport was dropped before that.
    pub async fn response(self) -> Result<Response<ResponseBody>, SendError> {
        self.head.await.map_err(|_disconnected| SendError::Closed)
    }
}
