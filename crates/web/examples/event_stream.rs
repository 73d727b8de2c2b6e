use butler_http::protocol::BoxError;
use butler_http::response::Respond;
use butler_web::{Endpoint, NoParams, Server, logging};
use http_body_util::BodyExt;
use std::time::Duration;
use tracing::{Level, info};

#[tokio::main]
async fn main() {
    logging::init(Level::DEBUG).expect("no subscriber installed yet");

    let server = Server::builder()
        .route(Endpoint::get("/ticks", |_request, _: NoParams, _: NoParams| async {
            Respond::ok().header("Content-Type", "text/event-stream").stream_writer(|writer| async move {
                for i in 0..5 {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    if writer.write_str(&format!("data: {i}\n\n")).await {
                        break;
                    }
                }
                Ok::<_, BoxError>(())
            })
        }))
        .build()
        .expect("valid routes");

    let response = server.handle(http::Request::get("/ticks").body(String::new()).unwrap()).await;
    info!(status = %response.status(), "head received");

    let mut body = response.into_body();
    while let Some(frame) = body.frame().await {
        if let Ok(data) = frame.expect("stream ended cleanly").into_data() {
            info!(chunk = ?data, "chunk received");
        }
    }
}
