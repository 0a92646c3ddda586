//! The compressing response writer.
//!
//! This module provides [`GzipWriter`], a decorator that presents the same
//! [`ResponseSink`] contract as the sink it wraps while transparently gzip-compressing
//! every body byte written through it. Downstream handlers keep writing plain bytes
//! and never learn that the transformation happened.
//!
//! The gzip stream and all header rewriting are deferred until the first non-empty
//! write. A handler that never writes a body therefore produces a response that is
//! indistinguishable from one sent without this writer installed: no
//! `Content-Encoding`, no `Vary`, no stray gzip header bytes. An eager design would
//! advertise an encoding for a body that never exists.

use std::fmt;
use std::io;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, VARY};
use http::{HeaderMap, HeaderValue, StatusCode};

use crate::error::GzipError;
use crate::negotiate::GZIP;
use crate::sink::{Hijacker, RawStream, ResponseSink, SinkWriter};
use crate::sniff::detect_content_type;

/// A [`ResponseSink`] decorator that gzip-compresses the response body.
///
/// The writer is a small one-way state machine. Unopened: the wrapped sink is held
/// directly and nothing has been touched. Open: the sink has moved into the gzip
/// encoder and the response headers carry the encoding. The transition runs on the
/// first non-empty write, exactly once, guarded by a single check — the writer is
/// request-scoped and never shared, so no locking is involved.
///
/// During the transition the writer sets `Content-Encoding` and `Vary`, and sniffs a
/// `Content-Type` from the first (uncompressed) chunk unless a handler already
/// declared one. Afterwards these headers are never rewritten again.
///
/// The gzip stream must be closed exactly once via [`finish`](Self::finish) at the
/// end of the request; dropping the writer instead closes it best-effort with errors
/// ignored, which is the right behavior when the request is cancelled.
pub struct GzipWriter<'a> {
    /// Holds the wrapped sink until the stream opens.
    sink: Option<&'a mut dyn ResponseSink>,
    /// Holds the gzip stream, and through it the sink, once open.
    stream: Option<GzEncoder<SinkWriter<'a>>>,
    wrote_header: bool,
    hijacked: bool,
    level: Compression,
}

impl<'a> GzipWriter<'a> {
    pub fn new(sink: &'a mut dyn ResponseSink) -> Self {
        Self::with_level(sink, Compression::default())
    }

    pub fn with_level(sink: &'a mut dyn ResponseSink, level: Compression) -> Self {
        Self { sink: Some(sink), stream: None, wrote_header: false, hijacked: false, level }
    }

    /// Whether the encoding headers have been committed, i.e. whether any body byte
    /// has been written through this writer yet.
    #[inline]
    pub fn wrote_header(&self) -> bool {
        self.wrote_header
    }

    /// Closes the gzip stream, flushing buffered compressed data and writing the
    /// format trailer with its checksum.
    ///
    /// A writer that never opened its stream, or whose connection has been taken
    /// over, has nothing to close and returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Close failures are surfaced to the caller; bytes already flushed to the sink
    /// are not undone. Decoders detect the resulting truncation through the trailer
    /// check.
    pub fn finish(mut self) -> Result<(), GzipError> {
        if self.hijacked {
            // the connection belongs to whoever took it over, leave the stream alone
            return Ok(());
        }
        match self.stream.take() {
            Some(stream) => {
                stream.finish()?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Opens the gzip stream and commits the encoding headers. Runs exactly once.
    fn open(&mut self, first_chunk: &[u8]) {
        // unwrap here is safe: `open` only runs from the unopened state, where `sink`
        // still holds the wrapped sink
        let sink = self.sink.take().unwrap();

        let headers = sink.headers_mut();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(GZIP));
        // caches must key on the negotiation header
        headers.insert(VARY, HeaderValue::from_name(ACCEPT_ENCODING));
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(detect_content_type(first_chunk)));
        }

        self.stream = Some(GzEncoder::new(SinkWriter(sink), self.level));
        self.wrote_header = true;
    }

    fn inner(&self) -> &dyn ResponseSink {
        match &self.stream {
            Some(stream) => &*stream.get_ref().0,
            // unwrap here is safe: exactly one of `stream` / `sink` holds the sink
            None => &**self.sink.as_ref().unwrap(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ResponseSink {
        match &mut self.stream {
            Some(stream) => &mut *stream.get_mut().0,
            // unwrap here is safe: exactly one of `stream` / `sink` holds the sink
            None => &mut **self.sink.as_mut().unwrap(),
        }
    }
}

impl ResponseSink for GzipWriter<'_> {
    fn headers(&self) -> &HeaderMap {
        self.inner().headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner_mut().headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.inner_mut().write_status(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            // an untouched writer must leave the response untouched
            return Ok(0);
        }
        if self.hijacked {
            return Err(io::Error::other("connection has been taken over"));
        }
        if !self.wrote_header {
            self.open(buf);
        }
        // unwrap here is safe: `open` just ensured the stream exists
        self.stream.as_mut().unwrap().write(buf)
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }
}

impl Hijacker for GzipWriter<'_> {
    /// Delegates the takeover to the wrapped sink if, and only if, the sink itself
    /// supports it. Silently pretending to support takeover would corrupt protocol
    /// upgrade flows, so an unsupporting sink yields an explicit error.
    fn hijack(&mut self) -> Result<Box<dyn RawStream>, GzipError> {
        match self.inner_mut().hijacker() {
            Some(hijacker) => {
                let raw = hijacker.hijack()?;
                self.hijacked = true;
                Ok(raw)
            }
            None => Err(GzipError::takeover_unsupported()),
        }
    }
}

impl fmt::Debug for GzipWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipWriter")
            .field("wrote_header", &self.wrote_header)
            .field("hijacked", &self.hijacked)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::GzipWriter;
    use crate::error::GzipError;
    use crate::sink::{BufferSink, Hijacker, MockHijacker, ResponseSink};
    use flate2::read::GzDecoder;
    use http::header::{CONTENT_ENCODING, CONTENT_TYPE, VARY};
    use http::{HeaderMap, StatusCode};
    use std::io;
    use std::io::Read;

    fn gunzip(body: &[u8]) -> Vec<u8> {
        let mut decoded = Vec::new();
        GzDecoder::new(body).read_to_end(&mut decoded).unwrap();
        decoded
    }

    #[test]
    fn test_empty_write_leaves_response_untouched() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        assert_eq!(writer.write(b"").unwrap(), 0);
        assert!(!writer.wrote_header());
        assert!(writer.headers().is_empty());

        writer.finish().unwrap();
        assert!(sink.headers().is_empty());
        assert!(sink.body().is_empty());
    }

    #[test]
    fn test_first_write_commits_headers_and_compresses() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        let written = writer.write(b"hello world").unwrap();
        assert_eq!(written, 11);
        assert!(writer.wrote_header());
        writer.finish().unwrap();

        assert_eq!(sink.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(sink.headers().get(VARY).unwrap(), "accept-encoding");
        assert_eq!(sink.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(gunzip(sink.body()), b"hello world");
    }

    #[test]
    fn test_multiple_writes_round_trip_in_order() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        writer.write(b"hello ").unwrap();
        writer.write(b"world").unwrap();
        writer.write(b"!").unwrap();
        writer.finish().unwrap();

        assert_eq!(gunzip(sink.body()), b"hello world!");
    }

    #[test]
    fn test_headers_are_committed_only_once() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        writer.write(b"<html><body>hi</body></html>").unwrap();
        // binary second chunk must not re-trigger sniffing
        writer.write(&[0x00, 0x01, 0x02]).unwrap();
        writer.finish().unwrap();

        assert_eq!(sink.headers().get_all(VARY).iter().count(), 1);
        assert_eq!(sink.headers().get_all(CONTENT_ENCODING).iter().count(), 1);
        assert_eq!(sink.headers().get(CONTENT_TYPE).unwrap(), "text/html; charset=utf-8");
    }

    #[test]
    fn test_declared_content_type_wins_over_sniffing() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        writer.headers_mut().insert(CONTENT_TYPE, "application/json".parse().unwrap());
        writer.write(b"{\"hello\": \"world\"}").unwrap();
        writer.finish().unwrap();

        assert_eq!(sink.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_status_passes_through() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        writer.write_status(StatusCode::CREATED);
        writer.write(b"created").unwrap();
        writer.finish().unwrap();

        assert_eq!(sink.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_takeover_fails_on_unsupporting_sink() {
        let mut sink = BufferSink::new();
        let mut writer = GzipWriter::new(&mut sink);

        let err = writer.hijacker().unwrap().hijack().err().unwrap();
        assert!(matches!(err, GzipError::TakeoverUnsupported));

        writer.finish().unwrap();
        // the failed takeover must not have produced any body bytes
        assert!(sink.body().is_empty());
    }

    struct HijackableSink {
        inner: BufferSink,
        hijacker: MockHijacker,
    }

    impl ResponseSink for HijackableSink {
        fn headers(&self) -> &HeaderMap {
            self.inner.headers()
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            self.inner.headers_mut()
        }

        fn write_status(&mut self, status: StatusCode) {
            self.inner.write_status(status);
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write(buf)
        }

        fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
            Some(&mut self.hijacker)
        }
    }

    #[test]
    fn test_takeover_delegates_to_supporting_sink() {
        let mut hijacker = MockHijacker::new();
        hijacker.expect_hijack().times(1).returning(|| Ok(Box::new(io::Cursor::new(Vec::new()))));
        let mut sink = HijackableSink { inner: BufferSink::new(), hijacker };

        let mut writer = GzipWriter::new(&mut sink);
        writer.hijacker().unwrap().hijack().unwrap();

        // after a successful takeover the response channel is dead
        assert!(writer.write(b"late bytes").is_err());
        writer.finish().unwrap();
        assert!(sink.inner.body().is_empty());
    }

    struct FailingSink {
        headers: HeaderMap,
    }

    impl ResponseSink for FailingSink {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_status(&mut self, _status: StatusCode) {}

        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("transport closed"))
        }
    }

    #[test]
    fn test_stream_write_failure_propagates() {
        let mut sink = FailingSink { headers: HeaderMap::new() };
        let mut writer = GzipWriter::new(&mut sink);

        assert!(writer.write(b"hello").is_err());
    }

    struct FlakySink {
        headers: HeaderMap,
        budget: usize,
    }

    impl ResponseSink for FlakySink {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_status(&mut self, _status: StatusCode) {}

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("transport closed"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_stream_close_failure_propagates() {
        // exactly enough budget for the 10 byte gzip header, closing must then fail
        let mut sink = FlakySink { headers: HeaderMap::new(), budget: 10 };
        let mut writer = GzipWriter::new(&mut sink);

        writer.write(b"hello world").unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, GzipError::Io { .. }));
    }
}
