use crate::request::Request;
use async_trait::async_trait;
use butler_http::protocol::BoxError;
use butler_http::response::Response;

/// Hooks around an endpoint handler.
///
/// Request hooks run in registration order, outer groups first, after authentication. The
/// first one returning a response stops the request chain and replaces the handler. Response
/// hooks run in the same order on whatever response was produced. An error from either hook
/// is logged and answered with 500.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Shown in logs.
    fn name(&self) -> &str {
        "middleware"
    }

    async fn on_request(&self, _request: &mut Request) -> Result<Option<Response>, BoxError> {
        Ok(None)
    }

    async fn on_response(&self, _request: &Request, response: Response) -> Result<Response, BoxError> {
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::Middleware;
    use crate::request::{PathParams, Request};
    use async_trait::async_trait;
    use butler_http::protocol::BoxError;
    use butler_http::response::{Respond, Response};
    use bytes::Bytes;
    use http::StatusCode;

    struct Maintenance;

    #[async_trait]
    impl Middleware for Maintenance {
        async fn on_request(&self, request: &mut Request) -> Result<Option<Response>, BoxError> {
            Ok(request.header("X-Maintenance").map(|_| Respond::service_unavailable()))
        }
    }

    struct Noop;

    impl Middleware for Noop {}

    fn request(maintenance: bool) -> Request {
        let mut builder = http::Request::get("/");
        if maintenance {
            builder = builder.header("X-Maintenance", "1");
        }
        Request::new(builder.body(()).unwrap().into(), PathParams::empty(), Bytes::new())
    }

    #[tokio::test]
    async fn request_hook_may_answer() {
        let answer = Maintenance.on_request(&mut request(true)).await.unwrap();
        assert_eq!(answer.unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(Maintenance.on_request(&mut request(false)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn defaults_pass_through() {
        let mut request = request(false);
        assert!(Noop.on_request(&mut request).await.unwrap().is_none());

        let response = Noop.on_response(&request, Respond::accepted()).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(Noop.name(), "middleware");
    }
}
