//! Request dispatching.
//!
//! [`Server`] matches the request path against the registered routes, then runs auth
//! handlers, middlewares, the endpoint handler and finally the delivery pipeline on a spawned
//! task. [`Server::handle`] resolves as soon as the response head is ready, a streamed body
//! keeps flowing afterwards.

use crate::auth::Authenticator;
use crate::group::{Group, ResolvedRoute, Route, Scope};
use crate::middleware::Middleware;
use crate::request::{PathParams, Request};
use butler_http::codec::CodecConfig;
use butler_http::protocol::{DeliveryError, RequestHeader};
use butler_http::response::{Delivered, Delivery, Respond, Response};
use butler_http::transport::{PendingResponse, ResponseBody, Transport, channel};
use http::{Method, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, error, info_span, warn};

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("no route registered")]
    NoRoutes,

    #[error("invalid route {path}: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("route {method} {path} registered twice")]
    DuplicateRoute { method: String, path: String },
}

/// Collects the route tree and the server wide settings.
#[derive(Debug, Default)]
pub struct ServerBuilder {
    root: Group,
    codec: CodecConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, route: impl Into<Route>) -> Self {
        self.root = self.root.route(route);
        self
    }

    /// Checked before the auth handlers of every group and endpoint.
    #[must_use]
    pub fn auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.root = self.root.auth(auth);
        self
    }

    /// Runs before the middlewares of every group and endpoint.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.root = self.root.middleware(middleware);
        self
    }

    /// Compressible types and minimum sizes used by automatic content encoding.
    #[must_use]
    pub fn codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        if self.root.routes().is_empty() {
            return Err(ServerBuildError::NoRoutes);
        }

        let codec = Arc::new(self.codec);
        let mut resolved = Vec::new();
        Route::from(self.root).resolve(&Scope::default(), &codec, &mut resolved);

        let mut by_path: HashMap<String, Vec<Arc<ResolvedRoute>>> = HashMap::new();
        for route in resolved {
            let routes = by_path.entry(route.path.clone()).or_default();
            if routes.iter().any(|existing| existing.method == route.method) {
                let method = route.method.as_ref().map_or("ANY", Method::as_str).to_owned();
                return Err(ServerBuildError::DuplicateRoute { method, path: route.path });
            }
            routes.push(Arc::new(route));
        }

        let mut router = matchit::Router::new();
        for (path, routes) in by_path {
            router
                .insert(path.clone(), routes)
                .map_err(|source| ServerBuildError::InvalidRoute { path, source })?;
        }

        Ok(Server { router })
    }
}

/// Dispatches requests to the registered endpoints.
pub struct Server {
    router: matchit::Router<Vec<Arc<ResolvedRoute>>>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}

enum Lookup {
    Found(Arc<ResolvedRoute>, PathParams),
    NotFound,
    MethodNotAllowed(String),
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Answers one request.
    ///
    /// Must be called within a tokio runtime: delivery runs on a spawned task so that streamed
    /// bodies are produced while the caller sends the head.
    pub async fn handle<B>(&self, request: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: Body,
        B::Error: Display,
    {
        let span = info_span!("request", method = %request.method(), path = request.uri().path());
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch<B>(&self, request: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: Body,
        B::Error: Display,
    {
        let (parts, body) = request.into_parts();
        let head = RequestHeader::from(parts);

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(cause = %e, "failed to read request body");
                return respond_directly(Respond::bad_request().text("invalid request body"), head).await;
            }
        };

        let (route, params) = match self.lookup(head.method(), head.path()) {
            Lookup::Found(route, params) => (route, params),
            Lookup::NotFound => {
                debug!("no route matched");
                return respond_directly(Respond::not_found(), head).await;
            }
            Lookup::MethodNotAllowed(allow) => {
                debug!(allow, "method not allowed");
                return respond_directly(Respond::method_not_allowed().header("Allow", allow), head).await;
            }
        };

        let request = Request::new(head, params, body);
        let (transport, pending) = channel();

        tokio::spawn(
            async move {
                let path = route.path.as_str();
                match route.run(request, Box::new(transport)).await {
                    Ok(delivered) => debug!(route = path, ?delivered, "request finished"),
                    Err(e) => error!(route = path, cause = %e, "failed to deliver response"),
                }
            }
            .in_current_span(),
        );

        await_head(pending).await
    }

    fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let Ok(matched) = self.router.at(path) else {
            return Lookup::NotFound;
        };

        match matched.value.iter().find(|route| route.method.as_ref().is_none_or(|m| m == method)) {
            Some(route) => Lookup::Found(Arc::clone(route), matched.params.into()),
            None => {
                let allow: Vec<_> = matched.value.iter().filter_map(|route| route.method.as_ref()).map(Method::as_str).collect();
                Lookup::MethodNotAllowed(allow.join(", "))
            }
        }
    }
}

impl ResolvedRoute {
    /// Auth, request middlewares, handler, response middlewares, delivery.
    async fn run(&self, mut request: Request, transport: Box<dyn Transport>) -> Result<Delivered, DeliveryError> {
        for auth in &self.auth {
            if let Some(refusal) = auth.authenticate(&mut request).await.to_response() {
                debug!(status = %refusal.status(), "authentication refused");
                return Delivery::default().deliver(refusal, request.head(), transport).await;
            }
        }

        let mut replacement = None;
        for middleware in &self.middlewares {
            match middleware.on_request(&mut request).await {
                Ok(None) => {}
                Ok(Some(response)) => {
                    replacement = Some(response);
                    break;
                }
                Err(e) => {
                    error!(middleware = middleware.name(), cause = %e, "middleware request handler failed");
                    return Delivery::default().deliver(internal_error(), request.head(), transport).await;
                }
            }
        }

        let request = Arc::new(request);
        let mut response = match replacement {
            Some(response) => response,
            None => self.endpoint.execute(Arc::clone(&request)).await,
        };

        for middleware in &self.middlewares {
            response = match middleware.on_response(&request, response).await {
                Ok(response) => response,
                Err(e) => {
                    error!(middleware = middleware.name(), cause = %e, "middleware response handler failed");
                    return Delivery::default().deliver(internal_error(), request.head(), transport).await;
                }
            };
        }

        self.delivery.deliver(response, request.head(), transport).await
    }
}

fn internal_error() -> Response {
    Respond::status(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Delivers a response produced by the server itself, without endpoint settings.
async fn respond_directly(response: Response, head: RequestHeader) -> http::Response<ResponseBody> {
    let (transport, pending) = channel();

    tokio::spawn(
        async move {
            if let Err(e) = Delivery::default().deliver(response, &head, Box::new(transport)).await {
                error!(cause = %e, "failed to deliver response");
            }
        }
        .in_current_span(),
    );

    await_head(pending).await
}

async fn await_head(pending: PendingResponse) -> http::Response<ResponseBody> {
    pending.response().await.unwrap_or_else(|e| {
        error!(cause = %e, "response head was never sent");
        let mut response = http::Response::new(ResponseBody::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
