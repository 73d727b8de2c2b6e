//! Response body content encoding.
//!
//! - [`Encoding`]: the directive a response or endpoint carries (`auto`, `none` or a coding)
//! - [`ContentCoding`]: a concrete coding written to `Content-Encoding`
//! - [`CodecConfig`]: the compressible MIME allowlist and per-coding minimum sizes
//!
//! Automatic selection checks brotli, deflate and gzip in that order and takes the first coding
//! the client accepts whose minimum size the body reaches. A failed compression is never fatal:
//! it is logged and the body goes out unencoded.

mod encoder;
pub use encoder::encode;

use crate::protocol::Headers;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{trace, warn};

/// Encoding directive of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Auto,
    None,
    Gzip,
    Brotli,
    Deflate,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown encoding `{0}`")]
pub struct UnknownEncoding(pub String);

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    /// Tokens are case-sensitive, an empty token means `auto`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "gzip" => Ok(Self::Gzip),
            "brotli" => Ok(Self::Brotli),
            "deflate" => Ok(Self::Deflate),
            other => Err(UnknownEncoding(other.to_owned())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Auto => "auto",
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Brotli => "brotli",
            Self::Deflate => "deflate",
        };
        f.write_str(token)
    }
}

/// A content coding this crate can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Gzip,
    Deflate,
    Br,
}

impl ContentCoding {
    /// Automatic selection order.
    const PREFERENCE: [ContentCoding; 3] = [ContentCoding::Br, ContentCoding::Deflate, ContentCoding::Gzip];

    /// Value of the `Content-Encoding` header, also the `Accept-Encoding` token looked for.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Br => "br",
        }
    }

    fn from_encoding(encoding: Encoding) -> Option<Self> {
        match encoding {
            Encoding::Gzip => Some(Self::Gzip),
            Encoding::Brotli => Some(Self::Br),
            Encoding::Deflate => Some(Self::Deflate),
            Encoding::Auto | Encoding::None => None,
        }
    }

    fn is_accepted(&self, accept_encoding: &str) -> bool {
        accept_encoding.contains(self.as_str())
    }
}

const DEFAULT_COMPRESSIBLE: [&str; 17] = [
    "application/json",
    "application/xml",
    "application/yaml",
    "text/calendar",
    "text/css",
    "text/csv",
    "text/html",
    "text/javascript",
    "text/markdown",
    "text/mathml",
    "text/plain",
    "text/prs.lines.tag",
    "text/richtext",
    "text/sgml",
    "text/tab-separated-values",
    "text/troff",
    "text/uri-list",
];

/// Immutable codec configuration, shared by every delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// A content type is compressible when it contains one of these entries.
    pub compressible: Vec<String>,
    pub brotli_min_size: usize,
    pub deflate_min_size: usize,
    pub gzip_min_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compressible: DEFAULT_COMPRESSIBLE.iter().map(|&mime| mime.to_owned()).collect(),
            brotli_min_size: 256,
            deflate_min_size: 512,
            gzip_min_size: 1024,
        }
    }
}

impl CodecConfig {
    pub fn min_size(&self, coding: ContentCoding) -> usize {
        match coding {
            ContentCoding::Br => self.brotli_min_size,
            ContentCoding::Deflate => self.deflate_min_size,
            ContentCoding::Gzip => self.gzip_min_size,
        }
    }

    pub fn is_compressible(&self, content_type: &str) -> bool {
        self.compressible.iter().any(|mime| content_type.contains(mime.as_str()))
    }

    /// Decides which coding, if any, a body of `len` bytes gets.
    ///
    /// An explicit coding skips the allowlist but still needs the client to accept it and the
    /// body to reach that coding's minimum size.
    pub fn select(
        &self,
        encoding: Encoding,
        content_type: Option<&str>,
        accept_encoding: Option<&str>,
        len: usize,
    ) -> Option<ContentCoding> {
        let accept_encoding = accept_encoding.unwrap_or_default();

        if encoding == Encoding::Auto {
            if !self.is_compressible(content_type.unwrap_or_default()) {
                return None;
            }

            return ContentCoding::PREFERENCE
                .into_iter()
                .find(|coding| coding.is_accepted(accept_encoding) && len >= self.min_size(*coding));
        }

        ContentCoding::from_encoding(encoding)
            .filter(|coding| coding.is_accepted(accept_encoding) && len >= self.min_size(*coding))
    }

    /// Compresses `body` in place and sets `Content-Encoding`.
    ///
    /// Nothing happens when the headers already carry a `Content-Encoding`. Returns the applied
    /// coding.
    pub fn apply(
        &self,
        encoding: Encoding,
        headers: &mut Headers,
        body: &mut Bytes,
        accept_encoding: Option<&str>,
    ) -> Option<ContentCoding> {
        if headers.has("Content-Encoding") || body.is_empty() {
            return None;
        }

        let coding = self.select(encoding, headers.get("Content-Type"), accept_encoding, body.len())?;

        match encode(coding, body.as_ref()) {
            Ok(encoded) => {
                trace!(coding = coding.as_str(), from = body.len(), to = encoded.len(), "encoded response body");
                *body = encoded;
                headers.set("Content-Encoding", coding.as_str());
                Some(coding)
            }
            Err(e) => {
                warn!(coding = coding.as_str(), cause = %e, "failed to encode response body, sending it unencoded");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CodecConfig, ContentCoding, Encoding, UnknownEncoding};
    use crate::protocol::Headers;
    use bytes::Bytes;
    use std::io::Read;

    #[test]
    fn parse_encoding_tokens() {
        assert_eq!("".parse::<Encoding>(), Ok(Encoding::Auto));
        assert_eq!("auto".parse::<Encoding>(), Ok(Encoding::Auto));
        assert_eq!("none".parse::<Encoding>(), Ok(Encoding::None));
        assert_eq!("brotli".parse::<Encoding>(), Ok(Encoding::Brotli));
        assert_eq!("GZIP".parse::<Encoding>(), Err(UnknownEncoding("GZIP".into())));
    }

    #[test]
    fn auto_prefers_brotli_then_deflate_then_gzip() {
        let config = CodecConfig::default();
        let json = Some("application/json");
        let all = Some("gzip, deflate, br");

        assert_eq!(config.select(Encoding::Auto, json, all, 256), Some(ContentCoding::Br));
        assert_eq!(config.select(Encoding::Auto, json, Some("gzip, deflate"), 600), Some(ContentCoding::Deflate));
        assert_eq!(config.select(Encoding::Auto, json, Some("gzip, deflate"), 511), None);
        assert_eq!(config.select(Encoding::Auto, json, Some("gzip"), 1024), Some(ContentCoding::Gzip));
        assert_eq!(config.select(Encoding::Auto, json, Some("gzip"), 1023), None);
    }

    #[test]
    fn auto_declines_incompressible_types() {
        let config = CodecConfig::default();
        assert_eq!(config.select(Encoding::Auto, Some("video/mp4"), Some("br"), 1 << 20), None);
        assert_eq!(config.select(Encoding::Auto, None, Some("br"), 1 << 20), None);
        assert_eq!(
            config.select(Encoding::Auto, Some("text/plain; charset=utf-8"), Some("br"), 300),
            Some(ContentCoding::Br)
        );
    }

    #[test]
    fn explicit_encoding_skips_allowlist() {
        let config = CodecConfig::default();
        assert_eq!(
            config.select(Encoding::Gzip, Some("video/mp4"), Some("gzip"), 2048),
            Some(ContentCoding::Gzip)
        );
        assert_eq!(config.select(Encoding::Gzip, Some("video/mp4"), Some("br"), 2048), None);
        assert_eq!(config.select(Encoding::Brotli, None, Some("br"), 255), None);
        assert_eq!(config.select(Encoding::None, Some("text/html"), Some("br"), 4096), None);
    }

    #[test]
    fn apply_replaces_body_and_sets_header() {
        let config = CodecConfig::default();
        let original = "{\"key\":\"value\"}".repeat(40);
        let mut headers = Headers::new();
        headers.set("Content-Type", "application/json");
        let mut body = Bytes::from(original.clone());

        let applied = config.apply(Encoding::Auto, &mut headers, &mut body, Some("br"));

        assert_eq!(applied, Some(ContentCoding::Br));
        assert_eq!(headers.get("content-encoding"), Some("br"));
        let mut decoded = String::new();
        brotli::Decompressor::new(body.as_ref(), 4096).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn apply_respects_existing_content_encoding() {
        let config = CodecConfig::default();
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html");
        headers.set("Content-Encoding", "identity");
        let mut body = Bytes::from(vec![b'a'; 4096]);

        assert_eq!(config.apply(Encoding::Auto, &mut headers, &mut body, Some("gzip, br")), None);
        assert_eq!(body.len(), 4096);
        assert_eq!(headers.get("Content-Encoding"), Some("identity"));
    }
}
