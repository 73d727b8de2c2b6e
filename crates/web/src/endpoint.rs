//! Typed endpoints.
//!
//! An [`Endpoint`] couples a method and a path pattern with a handler receiving the request,
//! its bound parameters `P` and its bound body `B`, plus the delivery settings applied to the
//! response the handler returns.

use crate::auth::Authenticator;
use crate::middleware::Middleware;
use crate::params::{NoParams, bind_body, bind_params};
use crate::request::Request;
use async_trait::async_trait;
use butler_http::cache::HttpCachePolicy;
use butler_http::codec::Encoding;
use butler_http::response::{Delivery, Response};
use butler_http::stream::StreamingSettings;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::Method;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

type HandlerFn<P, B> = Box<dyn Fn(Arc<Request>, P, B) -> BoxFuture<'static, Response> + Send + Sync>;

/// What every kind of endpoint carries besides its handler.
#[derive(Clone, Default)]
pub struct EndpointSettings {
    pub(crate) auth: Option<Arc<dyn Authenticator>>,
    pub(crate) encoding: Encoding,
    pub(crate) cache_policy: Option<HttpCachePolicy>,
    pub(crate) streaming_settings: Option<StreamingSettings>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) name: String,
    pub(crate) description: String,
}

impl fmt::Debug for EndpointSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSettings")
            .field("auth", &self.auth.is_some())
            .field("encoding", &self.encoding)
            .field("cache_policy", &self.cache_policy)
            .field("streaming_settings", &self.streaming_settings)
            .field("middlewares", &self.middlewares.len())
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

impl EndpointSettings {
    /// Endpoint level delivery settings, sharing `codec` with the rest of the server.
    pub(crate) fn delivery(&self, codec: &Arc<butler_http::codec::CodecConfig>) -> Delivery {
        let mut delivery = Delivery::new().encoding(self.encoding).codec(Arc::clone(codec));
        if let Some(policy) = &self.cache_policy {
            delivery = delivery.cache_policy(policy.clone());
        }
        if let Some(settings) = self.streaming_settings {
            delivery = delivery.streaming_settings(settings);
        }
        delivery
    }
}

/// Builder setters shared by every endpoint kind holding `settings: EndpointSettings`.
macro_rules! endpoint_settings {
    () => {
        /// Checked after the auth handlers of the enclosing groups.
        #[must_use]
        pub fn auth(mut self, auth: impl $crate::auth::Authenticator + 'static) -> Self {
            self.settings.auth = Some(std::sync::Arc::new(auth));
            self
        }

        /// Default encoding of the responses, `auto` unless set.
        #[must_use]
        pub fn encoding(mut self, encoding: butler_http::codec::Encoding) -> Self {
            self.settings.encoding = encoding;
            self
        }

        #[must_use]
        pub fn cache_policy(mut self, policy: butler_http::cache::HttpCachePolicy) -> Self {
            self.settings.cache_policy = Some(policy);
            self
        }

        #[must_use]
        pub fn streaming_settings(mut self, settings: butler_http::stream::StreamingSettings) -> Self {
            self.settings.streaming_settings = Some(settings);
            self
        }

        /// Runs after the middlewares of the enclosing groups.
        #[must_use]
        pub fn middleware(mut self, middleware: impl $crate::middleware::Middleware + 'static) -> Self {
            self.settings.middlewares.push(std::sync::Arc::new(middleware));
            self
        }

        #[must_use]
        pub fn name(mut self, name: impl Into<String>) -> Self {
            self.settings.name = name.into();
            self
        }

        #[must_use]
        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.settings.description = description.into();
            self
        }
    };
}

pub(crate) use endpoint_settings;

/// A route target with its settings, the handler types erased.
#[async_trait]
pub trait AnyEndpoint: Send + Sync + 'static {
    /// `None` matches every method.
    fn method(&self) -> Option<&Method>;

    /// Path pattern relative to the enclosing group.
    fn path(&self) -> &str;

    fn settings(&self) -> &EndpointSettings;

    /// Produces the response, authentication and middlewares already ran.
    async fn execute(&self, request: Arc<Request>) -> Response;
}

/// An endpoint with typed parameters `P` and body `B`.
///
/// ```
/// use butler_http::response::Respond;
/// use butler_web::{Endpoint, NoParams};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct UserParams {
///     id: u64,
/// }
///
/// let endpoint = Endpoint::get("/users/{id}", |_request, params: UserParams, _body: NoParams| async move {
///     Respond::ok().text(format!("user {}", params.id))
/// })
/// .name("Get user");
/// ```
pub struct Endpoint<P = NoParams, B = NoParams> {
    method: Option<Method>,
    path: String,
    handler: HandlerFn<P, B>,
    settings: EndpointSettings,
    _types: PhantomData<fn(P, B)>,
}

impl<P, B> fmt::Debug for Endpoint<P, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

macro_rules! method_endpoint {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("An endpoint answering `", stringify!($method), "` requests.")]
            pub fn $name<F, Fut>(path: impl Into<String>, handler: F) -> Self
            where
                F: Fn(Arc<Request>, P, B) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Response> + Send + 'static,
            {
                Self::with_method(Some(Method::$method), path, handler)
            }
        )*
    };
}

impl<P, B> Endpoint<P, B>
where
    P: DeserializeOwned + Send + 'static,
    B: DeserializeOwned + Send + 'static,
{
    method_endpoint! {
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
        head => HEAD,
        options => OPTIONS,
    }

    pub fn new<F, Fut>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Request>, P, B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::with_method(Some(method), path, handler)
    }

    /// An endpoint answering every method.
    pub fn any<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Request>, P, B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::with_method(None, path, handler)
    }

    fn with_method<F, Fut>(method: Option<Method>, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Request>, P, B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            method,
            path: path.into(),
            handler: Box::new(move |request, params, body| handler(request, params, body).boxed()),
            settings: EndpointSettings::default(),
            _types: PhantomData,
        }
    }

    endpoint_settings!();
}

#[async_trait]
impl<P, B> AnyEndpoint for Endpoint<P, B>
where
    P: DeserializeOwned + Send + 'static,
    B: DeserializeOwned + Send + 'static,
{
    fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    async fn execute(&self, request: Arc<Request>) -> Response {
        let body = match bind_body::<B>(&request) {
            Ok(body) => body,
            Err(e) => {
                warn!(cause = %e, "failed to bind request body");
                return e.to_response();
            }
        };

        let params = match bind_params::<P>(&request) {
            Ok(params) => params,
            Err(e) => {
                warn!(cause = %e, "failed to bind request parameters");
                return e.to_response();
            }
        };

        (self.handler)(request, params, body).await
    }
}
