//! Serving a directory of files.

use crate::endpoint::{AnyEndpoint, EndpointSettings, endpoint_settings};
use crate::group::join_path;
use crate::request::Request;
use async_trait::async_trait;
use butler_http::protocol::mime;
use butler_http::response::{Respond, Response};
use butler_http::units::MB;
use http::Method;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

/// Name of the catch-all path parameter holding the requested file.
const FILE_PARAM: &str = "file";

/// Files below this size are always sent buffered.
const STREAM_MIN_SIZE: u64 = MB as u64;

/// Serves the files below `dir` at `<prefix>/{*file}` for `GET` requests.
///
/// Scripts, documents, stylesheets, JSON and files under 1 MiB are read whole and sent
/// buffered, larger files are streamed from disk. Paths leaving the directory, missing files
/// and directories are answered 404.
#[derive(Debug)]
pub struct StaticFiles {
    path: String,
    dir: PathBuf,
    disable_streaming: bool,
    settings: EndpointSettings,
}

impl StaticFiles {
    pub fn new(prefix: &str, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let settings = EndpointSettings {
            name: "Static Files".to_owned(),
            description: format!("Serves static files from the local directory: '{}'", dir.display()),
            ..EndpointSettings::default()
        };

        Self { path: join_path(prefix, &format!("{{*{FILE_PARAM}}}")), dir, disable_streaming: false, settings }
    }

    /// Always sends files buffered and ignores `Range` requests.
    #[must_use]
    pub fn disable_streaming(mut self, disable: bool) -> Self {
        self.disable_streaming = disable;
        self
    }

    endpoint_settings!();

    async fn serve(&self, path: &Path) -> io::Result<Response> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Ok(Respond::not_found());
        }

        let content_type = match mime::from_extension(path) {
            Some(content_type) => content_type,
            None => sniff_file(path).await?,
        };

        let buffered = self.disable_streaming
            || matches!(content_type, "text/javascript" | "text/html" | "text/css" | "application/json")
            || metadata.len() < STREAM_MIN_SIZE;

        let mut response = if buffered {
            Respond::ok().file(path).await.allow_streaming(!self.disable_streaming)
        } else {
            Respond::ok().stream_file(path, content_type).await
        };

        if let Ok(modified) = metadata.modified() {
            response = response.header("Last-Modified", httpdate::fmt_http_date(modified));
        }

        Ok(response)
    }
}

async fn sniff_file(path: &Path) -> io::Result<&'static str> {
    let mut head = Vec::with_capacity(512);
    tokio::fs::File::open(path).await?.take(512).read_to_end(&mut head).await?;
    Ok(mime::sniff(&head))
}

/// The path below `dir` a request names, `None` when it would leave the directory.
fn resolve(dir: &Path, file: &str) -> Option<PathBuf> {
    let file = Path::new(file);
    file.components().all(|component| matches!(component, Component::Normal(_))).then(|| dir.join(file))
}

#[async_trait]
impl AnyEndpoint for StaticFiles {
    fn method(&self) -> Option<&Method> {
        Some(&Method::GET)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    async fn execute(&self, request: Arc<Request>) -> Response {
        let Some(path) = request.params().get(FILE_PARAM).and_then(|file| resolve(&self.dir, file)) else {
            debug!(path = request.path(), "rejected static file path");
            return Respond::not_found();
        };

        match self.serve(&path).await {
            Ok(response) => response,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Respond::not_found(),
            Err(e) => {
                error!(path = %path.display(), cause = %e, "failed to serve static file");
                Respond::internal_server_error()
            }
        }
    }
}
