//! HTTP caching semantics.
//!
//! [`HttpCachePolicy`] renders `Cache-Control`, [`resolve_cache_policy`] decides which policy
//! applies, and the ETag helpers generate content fingerprints and answer conditional requests.

mod etag;
pub use etag::apply_etag;
pub use etag::etag_of;
pub use etag::fnv1a_64;
pub use etag::is_not_modified;

mod policy;
pub use policy::HttpCachePolicy;
pub use policy::resolve_cache_policy;
