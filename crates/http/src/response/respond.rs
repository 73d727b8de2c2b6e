use crate::protocol::BoxError;
use crate::response::Response;
use crate::transport::Transport;
use futures::FutureExt;
use http::StatusCode;

/// Entry point for building responses: one constructor per status code.
///
/// ```
/// use butler_http::response::Respond;
///
/// let response = Respond::not_found().text("no such user");
/// assert_eq!(response.status(), 404);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Respond;

macro_rules! canned_responses {
    ($($name:ident => $status:ident),* $(,)?) => {
        impl Respond {
            $(
                #[doc = concat!("A response with status `", stringify!($status), "`.")]
                pub fn $name() -> Response {
                    Response::new(StatusCode::$status)
                }
            )*
        }
    };
}

canned_responses! {
    ok => OK,
    created => CREATED,
    accepted => ACCEPTED,
    non_authoritative_information => NON_AUTHORITATIVE_INFORMATION,
    no_content => NO_CONTENT,
    reset_content => RESET_CONTENT,
    partial_content => PARTIAL_CONTENT,
    multiple_choices => MULTIPLE_CHOICES,
    moved_permanently => MOVED_PERMANENTLY,
    found => FOUND,
    see_other => SEE_OTHER,
    not_modified => NOT_MODIFIED,
    temporary_redirect => TEMPORARY_REDIRECT,
    permanent_redirect => PERMANENT_REDIRECT,
    bad_request => BAD_REQUEST,
    unauthorized => UNAUTHORIZED,
    payment_required => PAYMENT_REQUIRED,
    forbidden => FORBIDDEN,
    not_found => NOT_FOUND,
    method_not_allowed => METHOD_NOT_ALLOWED,
    not_acceptable => NOT_ACCEPTABLE,
    proxy_auth_required => PROXY_AUTHENTICATION_REQUIRED,
    request_timeout => REQUEST_TIMEOUT,
    conflict => CONFLICT,
    gone => GONE,
    length_required => LENGTH_REQUIRED,
    precondition_failed => PRECONDITION_FAILED,
    payload_too_large => PAYLOAD_TOO_LARGE,
    uri_too_long => URI_TOO_LONG,
    unsupported_media_type => UNSUPPORTED_MEDIA_TYPE,
    range_not_satisfiable => RANGE_NOT_SATISFIABLE,
    expectation_failed => EXPECTATION_FAILED,
    misdirected_request => MISDIRECTED_REQUEST,
    upgrade_required => UPGRADE_REQUIRED,
    precondition_required => PRECONDITION_REQUIRED,
    too_many_requests => TOO_MANY_REQUESTS,
    request_header_fields_too_large => REQUEST_HEADER_FIELDS_TOO_LARGE,
    unavailable_for_legal_reasons => UNAVAILABLE_FOR_LEGAL_REASONS,
    internal_server_error => INTERNAL_SERVER_ERROR,
    not_implemented => NOT_IMPLEMENTED,
    bad_gateway => BAD_GATEWAY,
    service_unavailable => SERVICE_UNAVAILABLE,
    gateway_timeout => GATEWAY_TIMEOUT,
    http_version_not_supported => HTTP_VERSION_NOT_SUPPORTED,
    variant_also_negotiates => VARIANT_ALSO_NEGOTIATES,
    not_extended => NOT_EXTENDED,
    network_authentication_required => NETWORK_AUTHENTICATION_REQUIRED,
}

impl Respond {
    /// A response with an arbitrary status.
    pub fn status(status: StatusCode) -> Response {
        Response::new(status)
    }

    /// A response fully controlled by `handler`.
    ///
    /// Status, headers, body, cookies and every other setting of the response are ignored, the
    /// handler writes whatever it needs to the transport itself.
    pub fn handler<F, Fut>(handler: F) -> Response
    where
        F: FnOnce(Box<dyn Transport>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let mut response = Response::new(StatusCode::OK);
        response.custom = Some(Box::new(move |transport| handler(transport).boxed()));
        response
    }
}
