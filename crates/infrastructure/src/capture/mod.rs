//! The ingestion pipeline: frame sources feeding a bounded queue drained
//! by a pool of sink-owning workers, with a single-shot shutdown protocol.
mod server;
mod worker;

pub use server::CaptureServer;
