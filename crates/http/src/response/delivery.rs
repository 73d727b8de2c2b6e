use crate::cache::{HttpCachePolicy, apply_etag, is_not_modified, resolve_cache_policy};
use crate::codec::{CodecConfig, Encoding};
use crate::protocol::{DeliveryError, RequestHeader};
use crate::response::send::{Delivered, send};
use crate::response::{Payload, Response};
use crate::stream::StreamingSettings;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, trace};

/// Endpoint level delivery settings.
///
/// Response settings win over these: the response cache policy, encoding and streaming
/// settings are only filled in from here when the handler left them unset.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    cache_policy: Option<HttpCachePolicy>,
    encoding: Encoding,
    streaming_settings: Option<StreamingSettings>,
    codec: Arc<CodecConfig>,
}

impl Delivery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cache_policy(mut self, policy: HttpCachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn streaming_settings(mut self, settings: StreamingSettings) -> Self {
        self.streaming_settings = Some(settings);
        self
    }

    #[must_use]
    pub fn codec(mut self, codec: Arc<CodecConfig>) -> Self {
        self.codec = codec;
        self
    }

    /// Delivers `response`, the answer to `request`, through `transport`.
    ///
    /// Successful GET responses get their cache policy rendered to `Cache-Control` and an
    /// ETag; a matching `If-None-Match` turns them into a bodyless 304 before any encoding or
    /// streaming happens.
    pub async fn deliver(
        &self,
        mut response: Response,
        request: &RequestHeader,
        transport: Box<dyn Transport>,
    ) -> Result<Delivered, DeliveryError> {
        if response.custom.is_some() {
            return send(response, request, transport, &self.codec).await;
        }

        if response.streaming_settings.is_none() {
            response.streaming_settings = self.streaming_settings;
        }

        if response.status.as_u16() < 300 && request.is_get() {
            let policy =
                resolve_cache_policy(self.cache_policy.as_ref(), response.cache_policy.as_ref(), &response.headers)
                    .cloned();

            if let Some(policy) = policy {
                response.headers.set("Cache-Control", policy.to_header_value());

                if !policy.disable_etag_generation
                    && let Payload::Body(body) = &response.payload
                {
                    apply_etag(&mut response.headers, body, response.etag.as_deref());
                }

                if !policy.disable_auto_response
                    && is_not_modified(&response.headers, request.header("If-None-Match"))
                {
                    debug!(path = request.path(), "etag matched, answering 304");
                    send(response.into_not_modified(), request, transport, &self.codec).await?;
                    return Ok(Delivered::NotModified);
                }
            }
        }

        if response.encoding.is_none() {
            response.encoding = Some(self.encoding);
        }

        let delivered = send(response, request, transport, &self.codec).await?;
        trace!(?delivered, "response delivered");
        Ok(delivered)
    }
}
