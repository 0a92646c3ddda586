//! Transparent gzip compression for HTTP response pipelines.
//!
//! This crate inserts a response-compressing layer into a request/response pipeline:
//! it inspects the inbound request's `Accept-Encoding`, and when `gzip` is acceptable
//! it wraps the outbound response channel so that every body byte written by
//! downstream handlers reaches the network gzip-encoded — without those handlers
//! being aware of the transformation.
//!
//! The main components are:
//!
//! - [`ResponseSink`]: the seam to the surrounding server — headers, status, raw body
//!   bytes, and an optional connection-takeover capability
//! - [`GzipWriter`]: the compressing [`ResponseSink`] decorator with lazy stream
//!   creation and one-shot header rewriting
//! - [`GzipStage`]: the per-request decision point and end-of-request cleanup
//! - [`accepts_gzip`]: the content-coding negotiation check
//! - [`detect_content_type`]: MIME detection for bodies with no declared type
//!
//! Header rewriting (`Content-Encoding`, `Vary`, a sniffed `Content-Type`) happens on
//! the first non-empty write only, so a handler that writes nothing produces a
//! response identical to one sent without this crate installed. After the handler
//! chain returns, the stage drops the now meaningless `Content-Length` and closes the
//! gzip stream, writing the format trailer.
//!
//! # Example
//!
//! ```
//! use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
//! use micro_gzip::{BufferSink, GzipStage, ResponseSink};
//!
//! let req = http::Request::builder().header(ACCEPT_ENCODING, "gzip").body(()).unwrap();
//! let mut sink = BufferSink::new();
//!
//! let stage = GzipStage::new();
//! let result: Result<(), std::io::Error> = stage.handle(&req, &mut sink, |sink| {
//!     sink.write(b"hello world")?;
//!     Ok(())
//! });
//! result.unwrap();
//!
//! assert_eq!(sink.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
//! ```
//!
//! # Scope
//!
//! Single algorithm, single direction: this crate negotiates exactly one content
//! coding and only compresses response bodies. Request-body decompression, caching,
//! and multi-coding selection belong to other layers.

mod error;
mod negotiate;
mod sink;
mod sniff;
mod stage;
mod writer;

pub use error::GzipError;
pub use negotiate::{GZIP, accepts_gzip};
pub use sink::{BufferSink, Hijacker, RawStream, ResponseSink};
pub use sniff::detect_content_type;
pub use stage::GzipStage;
pub use writer::GzipWriter;
