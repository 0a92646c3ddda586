use http::HeaderMap;
use http::header::ACCEPT_ENCODING;

/// The content-coding token this crate negotiates and emits.
pub const GZIP: &str = "gzip";

/// Returns whether the request declared `gzip` as an acceptable content coding.
///
/// This is a plain substring test over the `Accept-Encoding` value, matching the
/// literal token case-sensitively. An absent, empty or non-UTF-8 header value is
/// not eligible.
// TODO: parse quality values, `gzip;q=0` forbids the coding but still matches here
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    match headers.get(ACCEPT_ENCODING) {
        Some(value) => value.to_str().is_ok_and(|value| value.contains(GZIP)),
        None => false,
    }
}
