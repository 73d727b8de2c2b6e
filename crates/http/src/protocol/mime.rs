//! Content type detection.
//!
//! [`from_extension`] maps well known file extensions, [`sniff`] inspects the first bytes of
//! the content the way browsers do and falls back to `application/octet-stream`.

use std::path::Path;

/// How many leading bytes [`sniff`] looks at.
const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type of a path by its extension, `None` when the extension is unknown.
pub fn from_extension(path: impl AsRef<Path>) -> Option<&'static str> {
    let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();

    let content_type = match extension.as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => return None,
    };

    Some(content_type)
}

const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const MAGIC: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"OggS\x00", "application/ogg"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"ID3", "audio/mpeg"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x00asm", "application/wasm"),
];

/// Detects the content type of `data` from its leading bytes.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let trimmed = trim_leading_whitespace(data);

    if HTML_TAGS.iter().any(|tag| is_html_tag(trimmed, tag)) {
        return "text/html; charset=utf-8";
    }

    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some((_, content_type)) = MAGIC.iter().find(|(magic, _)| data.starts_with(magic)) {
        return content_type;
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return "video/mp4";
    }

    if data.iter().any(|&byte| is_binary(byte)) { OCTET_STREAM } else { "text/plain; charset=utf-8" }
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|byte| !matches!(byte, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '));
    start.map_or(&[][..], |start| &data[start..])
}

/// Case-insensitive tag match that requires a space or `>` right after the tag.
fn is_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() <= tag.len() {
        return false;
    }

    data[..tag.len()].eq_ignore_ascii_case(tag) && matches!(data[tag.len()], b' ' | b'>')
}

fn is_binary(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::{OCTET_STREAM, from_extension, sniff};

    #[test]
    fn known_extensions() {
        assert_eq!(from_extension("static/script.js"), Some("text/javascript"));
        assert_eq!(from_extension("index.HTML"), Some("text/html"));
        assert_eq!(from_extension("data.json"), Some("application/json"));
        assert_eq!(from_extension("clip.mp4"), Some("video/mp4"));
        assert_eq!(from_extension("config.yml"), Some("application/yaml"));
    }

    #[test]
    fn unknown_extensions() {
        assert_eq!(from_extension("archive.xyz"), None);
        assert_eq!(from_extension("Makefile"), None);
    }

    #[test]
    fn sniff_markup() {
        assert_eq!(sniff(b"  <!DOCTYPE html><html></html>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<div>hi</div>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<?xml version=\"1.0\"?><a/>"), "text/xml; charset=utf-8");
    }

    #[test]
    fn sniff_magic_numbers() {
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\x00\x00"), "image/png");
        assert_eq!(sniff(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff(b"\x00\x00\x00\x20ftypisom\x00\x00\x02\x00"), "video/mp4");
    }

    #[test]
    fn sniff_text_and_binary() {
        assert_eq!(sniff(b"plain words"), "text/plain; charset=utf-8");
        assert_eq!(sniff(&[0x01, 0x02, 0x03]), OCTET_STREAM);
    }
}
