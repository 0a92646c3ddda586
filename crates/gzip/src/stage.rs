//! The pipeline stage that installs response compression.
//!
//! [`GzipStage`] is the integration point with the surrounding handler chain: it
//! decides per request whether compression applies, installs a [`GzipWriter`] as the
//! sink visible to everything downstream, and performs end-of-request cleanup once
//! the chain returns.

use flate2::Compression;
use http::Request;
use http::header::CONTENT_LENGTH;
use tracing::error;

use crate::negotiate::accepts_gzip;
use crate::sink::ResponseSink;
use crate::writer::GzipWriter;

/// Installs gzip response compression around a response sink for eligible requests.
///
/// Construct one per pipeline and call [`handle`](Self::handle) once per request,
/// passing the downstream handler chain as `next`.
#[derive(Debug, Clone, Copy)]
pub struct GzipStage {
    level: Compression,
}

impl GzipStage {
    pub fn new() -> Self {
        Self { level: Compression::default() }
    }

    /// Uses a specific compression level instead of the default.
    pub fn with_level(level: Compression) -> Self {
        Self { level }
    }

    /// Runs one request through the stage.
    ///
    /// When the request does not accept gzip, `next` observes `sink` unchanged and the
    /// stage adds no overhead. Otherwise `next` observes the compressing writer, and
    /// once it returns — with a result or an error — the stage finalizes: a now stale
    /// `Content-Length` is dropped and the gzip stream is closed, flushing buffered
    /// data and the trailer. Close failures are logged rather than returned, because
    /// body bytes may already be on the wire and cannot be taken back. A chain that
    /// wrote nothing leaves the response headers exactly as it found them.
    pub fn handle<B, T, E, F>(&self, req: &Request<B>, sink: &mut dyn ResponseSink, next: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ResponseSink) -> Result<T, E>,
    {
        if !accepts_gzip(req.headers()) {
            return next(sink);
        }

        let mut writer = GzipWriter::with_level(sink, self.level);
        let result = next(&mut writer);

        if writer.wrote_header() {
            // this length described the uncompressed body
            writer.headers_mut().remove(CONTENT_LENGTH);
            if let Err(e) = writer.finish() {
                error!(cause = %e, "failed to close gzip stream");
            }
        }

        result
    }
}

impl Default for GzipStage {
    fn default() -> Self {
        Self::new()
    }
}
