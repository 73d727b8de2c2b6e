use butler_http::cache::HttpCachePolicy;
use butler_http::response::Respond;
use butler_web::{AuthOutcome, Endpoint, Group, NoParams, Request, Server, auth_fn, logging};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};

#[derive(Deserialize)]
struct BookParams {
    id: u32,
}

#[derive(Serialize, Deserialize)]
struct Book {
    id: u32,
    title: String,
}

fn api_key(request: &mut Request) -> AuthOutcome {
    match request.header("X-Api-Key") {
        Some("secret") => AuthOutcome::Ok,
        Some(_) => AuthOutcome::Forbidden,
        None => AuthOutcome::Unauthorized,
    }
}

#[tokio::main]
async fn main() {
    logging::init(Level::INFO).expect("no subscriber installed yet");

    let books = Group::new("/books")
        .route(
            Endpoint::get("/{id}", |_request, params: BookParams, _: NoParams| async move {
                Respond::ok().json(&Book { id: params.id, title: format!("Volume {}", params.id) })
            })
            .cache_policy(HttpCachePolicy { max_age: Duration::from_secs(3600), ..Default::default() }),
        )
        .route(
            Endpoint::post("/", |_request: Arc<Request>, _: NoParams, book: Book| async move {
                Respond::created().json(&book)
            })
            .auth(auth_fn(api_key)),
        );

    let server = Server::builder().route(books).build().expect("valid routes");

    for request in [
        http::Request::get("/books/3").body(String::new()).unwrap(),
        http::Request::post("/books")
            .header("Content-Type", "application/json")
            .body(r#"{"id":4,"title":"Dune"}"#.to_owned())
            .unwrap(),
    ] {
        let (parts, body) = server.handle(request).await.into_parts();
        let body = body.collect().await.expect("complete body").to_bytes();
        info!(status = %parts.status, headers = ?parts.headers, body = ?body, "response");
    }
}
