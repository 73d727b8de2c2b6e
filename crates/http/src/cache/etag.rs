use crate::protocol::Headers;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a digest of `data`.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

/// Lowercase hex of the body digest, unquoted.
pub fn etag_of(body: &[u8]) -> String {
    format!("{:x}", fnv1a_64(body))
}

/// Writes the `ETag` header for a buffered body.
///
/// Empty bodies get no tag. An explicit tag is written unconditionally, otherwise the digest is
/// written unless a tag is already present.
pub fn apply_etag(headers: &mut Headers, body: &[u8], explicit: Option<&str>) {
    if body.is_empty() {
        return;
    }

    if let Some(etag) = explicit {
        headers.set("ETag", etag);
        return;
    }

    if !headers.has("ETag") {
        headers.set("ETag", etag_of(body));
    }
}

/// True when the request's `If-None-Match` is exactly the response's `ETag`.
pub fn is_not_modified(headers: &Headers, if_none_match: Option<&str>) -> bool {
    match (headers.get("ETag"), if_none_match) {
        (Some(etag), Some(if_none_match)) => !etag.is_empty() && etag == if_none_match,
        _ => false,
    }
}
