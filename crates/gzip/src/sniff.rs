//! Content type detection from leading body bytes.
//!
//! When a handler writes a body without declaring a `Content-Type`, the compressing
//! writer infers one from the first chunk before any compression is applied. Detection
//! is prefix based: byte-order marks, markup tags, then a magic-number table, falling
//! back to `text/plain` or `application/octet-stream` depending on whether the data
//! contains binary control bytes. It always produces an answer and never fails.

/// Only this many leading bytes participate in detection.
const MAX_SNIFF_LEN: usize = 512;

/// Markup prefixes that identify an HTML document. Matched case-insensitively after
/// skipping leading whitespace, and only when terminated by whitespace or `>`.
const HTML_TAGS: &[&str] = &[
    "<!DOCTYPE HTML",
    "<HTML",
    "<HEAD",
    "<SCRIPT",
    "<IFRAME",
    "<H1",
    "<DIV",
    "<FONT",
    "<TABLE",
    "<A",
    "<STYLE",
    "<TITLE",
    "<B",
    "<BODY",
    "<BR",
    "<P",
    "<!--",
];

const MAGIC_NUMBERS: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1a\x07\x00", "application/x-rar-compressed"),
    (b"\x00asm", "application/wasm"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
];

/// Infer a MIME type from the leading bytes of a body.
pub fn detect_content_type(chunk: &[u8]) -> &'static str {
    let data = &chunk[..chunk.len().min(MAX_SNIFF_LEN)];

    if let Some(mime) = sniff_bom(data) {
        return mime;
    }
    if let Some(mime) = sniff_markup(data) {
        return mime;
    }
    if let Some(mime) = sniff_magic(data) {
        return mime;
    }

    if data.iter().any(|b| is_binary_byte(*b)) { "application/octet-stream" } else { "text/plain; charset=utf-8" }
}

fn sniff_bom(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xef, 0xbb, 0xbf]) {
        return Some("text/plain; charset=utf-8");
    }
    if data.starts_with(&[0xfe, 0xff]) {
        return Some("text/plain; charset=utf-16be");
    }
    if data.starts_with(&[0xff, 0xfe]) {
        return Some("text/plain; charset=utf-16le");
    }
    None
}

fn sniff_markup(data: &[u8]) -> Option<&'static str> {
    let trimmed = data.trim_ascii_start();
    for tag in HTML_TAGS {
        if matches_tag(trimmed, tag.as_bytes()) {
            return Some("text/html; charset=utf-8");
        }
    }
    if trimmed.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }
    None
}

fn matches_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() <= tag.len() {
        return false;
    }
    let (head, rest) = data.split_at(tag.len());
    if !head.eq_ignore_ascii_case(tag) {
        return false;
    }
    // a tag prefix only counts when terminated, `<b` must not match `<blockquote`
    matches!(rest.first(), Some(b'\t' | b'\n' | b'\x0c' | b'\r' | b' ' | b'>'))
}

fn sniff_magic(data: &[u8]) -> Option<&'static str> {
    for &(magic, mime) in MAGIC_NUMBERS {
        if data.starts_with(magic) {
            return Some(mime);
        }
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    None
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}
