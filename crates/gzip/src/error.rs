use std::io;
use thiserror::Error;

/// Errors surfaced by the compressing response writer.
///
/// Errors on the byte-producing paths are never swallowed: a failed stream write or a
/// failed close propagates to the caller verbatim. A truncated body is detectable by
/// any standard gzip decoder through the trailer checksum, so no recovery is attempted
/// here.
#[derive(Error, Debug)]
pub enum GzipError {
    #[error("the wrapped response sink does not support connection takeover")]
    TakeoverUnsupported,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl GzipError {
    pub fn takeover_unsupported() -> Self {
        Self::TakeoverUnsupported
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
