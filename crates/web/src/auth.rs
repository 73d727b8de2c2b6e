use crate::request::Request;
use async_trait::async_trait;
use butler_http::response::{Respond, Response};

/// Result of one authentication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Ok,
    /// The server does not know who the client is.
    Unauthorized,
    /// The server knows the client but refuses access.
    Forbidden,
}

impl AuthOutcome {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// The bodyless answer to a failed check, `None` when it passed.
    pub fn to_response(self) -> Option<Response> {
        match self {
            Self::Ok => None,
            Self::Unauthorized => Some(Respond::unauthorized()),
            Self::Forbidden => Some(Respond::forbidden()),
        }
    }
}

/// Runs before any middleware or handler of the endpoints and groups it is attached to.
///
/// Checks accumulate from the outermost group to the endpoint, the first failure is answered
/// right away.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &mut Request) -> AuthOutcome;
}

struct FnAuthenticator<F>(F);

#[async_trait]
impl<F> Authenticator for FnAuthenticator<F>
where
    F: Fn(&mut Request) -> AuthOutcome + Send + Sync,
{
    async fn authenticate(&self, request: &mut Request) -> AuthOutcome {
        (self.0)(request)
    }
}

/// An [`Authenticator`] from a plain function.
///
/// The function may store what it learned about the client in the request extensions.
pub fn auth_fn<F>(f: F) -> impl Authenticator
where
    F: Fn(&mut Request) -> AuthOutcome + Send + Sync,
{
    FnAuthenticator(f)
}

#[cfg(test)]
mod tests {
    use super::{AuthOutcome, Authenticator, auth_fn};
    use crate::request::{PathParams, Request};
    use bytes::Bytes;
    use http::StatusCode;

    #[derive(Debug, Clone, PartialEq)]
    struct User(&'static str);

    fn bearer(request: &mut Request) -> AuthOutcome {
        match request.header("Authorization") {
            Some("Bearer admin") => {
                request.extensions_mut().insert(User("admin"));
                AuthOutcome::Ok
            }
            Some(_) => AuthOutcome::Forbidden,
            None => AuthOutcome::Unauthorized,
        }
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = http::Request::get("/");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        Request::new(builder.body(()).unwrap().into(), PathParams::empty(), Bytes::new())
    }

    #[tokio::test]
    async fn fn_authenticator_outcomes() {
        let auth = auth_fn(bearer);

        let mut admin = request(Some("Bearer admin"));
        assert_eq!(auth.authenticate(&mut admin).await, AuthOutcome::Ok);
        assert_eq!(admin.extensions().get::<User>(), Some(&User("admin")));

        assert_eq!(auth.authenticate(&mut request(Some("Bearer guest"))).await, AuthOutcome::Forbidden);
        assert_eq!(auth.authenticate(&mut request(None)).await, AuthOutcome::Unauthorized);
    }

    #[test]
    fn failure_responses() {
        assert!(AuthOutcome::Ok.to_response().is_none());
        assert_eq!(AuthOutcome::Unauthorized.to_response().unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthOutcome::Forbidden.to_response().unwrap().status(), StatusCode::FORBIDDEN);
    }
}
