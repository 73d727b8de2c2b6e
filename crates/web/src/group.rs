//! Route trees: endpoints nested in groups sharing a path prefix, auth and middlewares.

use crate::auth::Authenticator;
use crate::endpoint::{AnyEndpoint, Endpoint};
use crate::middleware::Middleware;
use crate::static_files::StaticFiles;
use butler_http::codec::CodecConfig;
use butler_http::response::Delivery;
use http::Method;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// One node of the route tree.
pub enum Route {
    Endpoint(Box<dyn AnyEndpoint>),
    Group(Group),
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(endpoint) => f.debug_tuple("Endpoint").field(&endpoint.path()).finish(),
            Self::Group(group) => f.debug_tuple("Group").field(group).finish(),
        }
    }
}

impl<P, B> From<Endpoint<P, B>> for Route
where
    P: DeserializeOwned + Send + 'static,
    B: DeserializeOwned + Send + 'static,
{
    fn from(endpoint: Endpoint<P, B>) -> Self {
        Self::Endpoint(Box::new(endpoint))
    }
}

impl From<StaticFiles> for Route {
    fn from(files: StaticFiles) -> Self {
        Self::Endpoint(Box::new(files))
    }
}

impl From<Group> for Route {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

/// Endpoints under a common path prefix.
///
/// The auth handler and middlewares of a group apply to everything inside it, after those of
/// the enclosing groups.
#[derive(Default)]
pub struct Group {
    path: String,
    auth: Option<Arc<dyn Authenticator>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    routes: Vec<Route>,
    name: String,
    description: String,
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("path", &self.path)
            .field("auth", &self.auth.is_some())
            .field("middlewares", &self.middlewares.len())
            .field("routes", &self.routes)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Group {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Self::default() }
    }

    #[must_use]
    pub fn auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn route(mut self, route: impl Into<Route>) -> Self {
        self.routes.push(route.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Joins two path segments with exactly one slash between them.
pub fn join_path(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return if base.is_empty() { "/".to_owned() } else { base.to_owned() };
    }
    format!("{}/{path}", base.trim_end_matches('/'))
}

/// What the enclosing groups contribute to an endpoint.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    pub(crate) path: String,
    pub(crate) auth: Vec<Arc<dyn Authenticator>>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
}

impl Scope {
    fn enter(&self, group: &mut Group) -> Self {
        let mut scope = self.clone();
        scope.path = join_path(&self.path, &group.path);
        scope.auth.extend(group.auth.take());
        scope.middlewares.append(&mut group.middlewares);
        scope
    }
}

/// An endpoint with everything it inherited from its groups resolved.
pub(crate) struct ResolvedRoute {
    pub(crate) method: Option<Method>,
    pub(crate) path: String,
    pub(crate) endpoint: Box<dyn AnyEndpoint>,
    pub(crate) auth: Vec<Arc<dyn Authenticator>>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) delivery: Delivery,
}

impl Route {
    /// Flattens the tree below `scope` into `resolved`, depth first.
    pub(crate) fn resolve(self, scope: &Scope, codec: &Arc<CodecConfig>, resolved: &mut Vec<ResolvedRoute>) {
        match self {
            Self::Endpoint(endpoint) => {
                let settings = endpoint.settings();

                let mut auth = scope.auth.clone();
                auth.extend(settings.auth.clone());
                let mut middlewares = scope.middlewares.clone();
                middlewares.extend(settings.middlewares.iter().cloned());

                resolved.push(ResolvedRoute {
                    method: endpoint.method().cloned(),
                    path: join_path(&scope.path, endpoint.path()),
                    delivery: settings.delivery(codec),
                    auth,
                    middlewares,
                    endpoint,
                });
            }
            Self::Group(mut group) => {
                let scope = scope.enter(&mut group);
                for route in group.routes {
                    route.resolve(&scope, codec, resolved);
                }
            }
        }
    }
}
