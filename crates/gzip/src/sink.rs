//! The response sink abstraction the compressing writer decorates.
//!
//! This module defines the seam between this crate and the surrounding server
//! infrastructure:
//!
//! - [`ResponseSink`]: the outbound response channel (headers + status + body bytes)
//!   for one request
//! - [`Hijacker`]: the optional connection-takeover capability a sink may expose
//! - [`BufferSink`]: an in-memory sink for tests and examples
//!
//! The infrastructure owns the sink; this crate never constructs or destroys one,
//! it only wraps a borrowed sink for the lifetime of a single request.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use std::io;

use crate::error::GzipError;

/// The outbound response channel for one request.
///
/// Writes are sequential from the handler chain's perspective; implementations are not
/// required to be usable from multiple tasks. Header mutations are only observable as
/// long as the underlying transport has not flushed the header block yet, which is the
/// infrastructure's concern.
pub trait ResponseSink {
    /// Returns the response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the response headers for mutation.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the response status code.
    fn write_status(&mut self, status: StatusCode);

    /// Accepts raw body bytes, returning how many were consumed.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Returns the connection-takeover capability, if this sink supports one.
    ///
    /// The default is `None`: takeover is an optional capability, and callers must
    /// check for it at the call site instead of assuming support.
    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }
}

/// The connection-takeover capability.
///
/// Protocol upgrades (websocket style) need the raw connection underneath the response
/// channel. A sink that can surrender its connection exposes this trait through
/// [`ResponseSink::hijacker`].
#[cfg_attr(test, mockall::automock)]
pub trait Hijacker {
    /// Hands the raw connection over to the caller.
    ///
    /// After a successful takeover the response channel must no longer be written
    /// through; the connection belongs to the caller.
    fn hijack(&mut self) -> Result<Box<dyn RawStream>, GzipError>;
}

/// The raw byte stream handed back by [`Hijacker::hijack`].
pub trait RawStream: io::Read + io::Write + Send {}

impl<T: io::Read + io::Write + Send> RawStream for T {}

// io bridge so a flate2 encoder can write straight through to a sink
pub(crate) struct SinkWriter<'a>(pub(crate) &'a mut dyn ResponseSink);

impl io::Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory [`ResponseSink`] that records everything written to it.
///
/// Mainly useful in tests and examples, both here and in embedding servers' own
/// test suites.
#[derive(Debug)]
pub struct BufferSink {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: BytesMut,
}

impl BufferSink {
    pub fn new() -> Self {
        Self { headers: HeaderMap::new(), status: None, body: BytesMut::with_capacity(4096) }
    }

    /// The committed status code, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The body bytes accepted so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Takes the accumulated body bytes out of the sink.
    pub fn take_body(&mut self) -> Bytes {
        self.body.split().freeze()
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for BufferSink {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
