//! Typed endpoints on top of the butler delivery core.
//!
//! Endpoints declare their method, path pattern and handler; the handler receives the request
//! with its path and query parameters bound into `P` and its body bound into `B`. Endpoints
//! nest in [`Group`]s sharing a path prefix, [`Authenticator`]s and [`Middleware`]s, and
//! every response goes through [`butler_http::response::Delivery`]: caching, ETags, content
//! encoding and streaming apply without the handler doing anything.
//!
//! ```no_run
//! use butler_http::response::Respond;
//! use butler_web::{Endpoint, Group, NoParams, Server, StaticFiles};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Greeting {
//!     name: String,
//! }
//!
//! # async fn run() {
//! let server = Server::builder()
//!     .route(Group::new("/api").route(Endpoint::get("/hello/{name}", |_request, greeting: Greeting, _: NoParams| async move {
//!         Respond::ok().text(format!("Hello {}!", greeting.name))
//!     })))
//!     .route(StaticFiles::new("/assets", "public"))
//!     .build()
//!     .unwrap();
//!
//! let response = server.handle(http::Request::get("/api/hello/ada").body(String::new()).unwrap()).await;
//! assert_eq!(response.status(), 200);
//! # }
//! ```

mod auth;
mod endpoint;
mod group;
mod middleware;
mod params;
mod request;
mod server;
mod static_files;

pub mod logging;

pub use auth::AuthOutcome;
pub use auth::Authenticator;
pub use auth::auth_fn;
pub use endpoint::AnyEndpoint;
pub use endpoint::Endpoint;
pub use endpoint::EndpointSettings;
pub use group::Group;
pub use group::Route;
pub use group::join_path;
pub use middleware::Middleware;
pub use params::NoParams;
pub use params::ParamError;
pub use params::bind_body;
pub use params::bind_params;
pub use request::PathParams;
pub use request::Request;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use static_files::StaticFiles;
