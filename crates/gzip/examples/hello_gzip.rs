use flate2::read::GzDecoder;
use http::header::ACCEPT_ENCODING;
use micro_gzip::{BufferSink, GzipStage, ResponseSink};
use std::io::Read;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let req = http::Request::builder().uri("/").header(ACCEPT_ENCODING, "gzip").body(()).unwrap();
    let mut sink = BufferSink::new();

    let stage = GzipStage::new();
    let result: Result<(), std::io::Error> = stage.handle(&req, &mut sink, |sink| {
        sink.write(b"hello world, but smaller on the wire")?;
        Ok(())
    });
    result.expect("handler chain failed");

    for (name, value) in sink.headers() {
        info!(header = %name, value = ?value, "response header");
    }

    let mut decoded = String::new();
    GzDecoder::new(sink.body()).read_to_string(&mut decoded).expect("body should be valid gzip");
    info!(compressed_len = sink.body().len(), decoded = %decoded, "round trip complete");
}
