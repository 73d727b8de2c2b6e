use crate::protocol::Headers;
use std::fmt::Write;
use std::time::Duration;

/// Structured `Cache-Control` directives.
///
/// A zero duration and a `false` flag mean the directive is absent. Rendering always starts
/// with `public` unless [`private`](HttpCachePolicy::private) is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpCachePolicy {
    /// Skip the automatic 304 answer when `If-None-Match` matches the ETag.
    pub disable_auto_response: bool,
    /// Skip ETag generation for responses under this policy.
    pub disable_etag_generation: bool,
    pub max_age: Duration,
    pub s_max_age: Duration,
    pub stale_while_revalidate: Duration,
    pub stale_if_error: Duration,
    pub immutable: bool,
    pub no_store: bool,
    pub no_cache: bool,
    pub must_revalidate: bool,
    pub private: bool,
    pub proxy_revalidate: bool,
    pub must_understand: bool,
    pub no_transform: bool,
}

impl HttpCachePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the policy as a `Cache-Control` value, directives in a fixed order.
    pub fn to_header_value(&self) -> String {
        let mut value = String::from(if self.private { "private" } else { "public" });

        let seconds = |name: &str, duration: Duration, value: &mut String| {
            if !duration.is_zero() {
                // writing into a String never fails
                let _ = write!(value, ", {name}={}", duration.as_secs());
            }
        };
        let flag = |name: &str, active: bool, value: &mut String| {
            if active {
                value.push_str(", ");
                value.push_str(name);
            }
        };

        seconds("max-age", self.max_age, &mut value);
        seconds("s-maxage", self.s_max_age, &mut value);
        flag("no-store", self.no_store, &mut value);
        flag("no-cache", self.no_cache, &mut value);
        flag("immutable", self.immutable, &mut value);
        flag("must-revalidate", self.must_revalidate, &mut value);
        flag("proxy-revalidate", self.proxy_revalidate, &mut value);
        flag("must-understand", self.must_understand, &mut value);
        flag("no-transform", self.no_transform, &mut value);
        seconds("stale-while-revalidate", self.stale_while_revalidate, &mut value);
        seconds("stale-if-error", self.stale_if_error, &mut value);

        value
    }
}

/// Picks the policy that applies to a response.
///
/// A `Cache-Control` header already set by the handler wins, then the response policy, then the
/// endpoint policy.
pub fn resolve_cache_policy<'a>(
    endpoint: Option<&'a HttpCachePolicy>,
    response: Option<&'a HttpCachePolicy>,
    headers: &Headers,
) -> Option<&'a HttpCachePolicy> {
    if headers.has("Cache-Control") {
        return None;
    }

    response.or(endpoint)
}

#[cfg(test)]
mod tests {
    use super::{HttpCachePolicy, resolve_cache_policy};
    use crate::protocol::Headers;
    use std::time::Duration;

    #[test]
    fn default_policy_is_public() {
        assert_eq!(HttpCachePolicy::new().to_header_value(), "public");
    }

    #[test]
    fn max_age_in_seconds() {
        let policy = HttpCachePolicy { max_age: Duration::from_secs(3600), ..Default::default() };
        assert_eq!(policy.to_header_value(), "public, max-age=3600");
    }

    #[test]
    fn durations_are_truncated() {
        let policy = HttpCachePolicy { max_age: Duration::from_millis(1999), ..Default::default() };
        assert_eq!(policy.to_header_value(), "public, max-age=1");
    }

    #[test]
    fn every_directive_in_order() {
        let policy = HttpCachePolicy {
            disable_auto_response: true,
            disable_etag_generation: true,
            max_age: Duration::from_secs(60),
            s_max_age: Duration::from_secs(120),
            stale_while_revalidate: Duration::from_secs(30),
            stale_if_error: Duration::from_secs(15),
            immutable: true,
            no_store: true,
            no_cache: true,
            must_revalidate: true,
            private: true,
            proxy_revalidate: true,
            must_understand: true,
            no_transform: true,
        };

        assert_eq!(
            policy.to_header_value(),
            "private, max-age=60, s-maxage=120, no-store, no-cache, immutable, must-revalidate, \
             proxy-revalidate, must-understand, no-transform, stale-while-revalidate=30, stale-if-error=15"
        );
    }

    #[test]
    fn response_policy_wins_over_endpoint() {
        let endpoint = HttpCachePolicy { max_age: Duration::from_secs(10), ..Default::default() };
        let response = HttpCachePolicy { no_store: true, ..Default::default() };
        let headers = Headers::new();

        assert_eq!(resolve_cache_policy(Some(&endpoint), Some(&response), &headers), Some(&response));
        assert_eq!(resolve_cache_policy(Some(&endpoint), None, &headers), Some(&endpoint));
        assert_eq!(resolve_cache_policy(None, None, &headers), None);
    }

    #[test]
    fn existing_header_wins_over_policies() {
        let endpoint = HttpCachePolicy::default();
        let mut headers = Headers::new();
        headers.set("cache-control", "no-cache");

        assert_eq!(resolve_cache_policy(Some(&endpoint), Some(&endpoint), &headers), None);
    }
}
