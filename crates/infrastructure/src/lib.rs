//! passivedns Infrastructure Layer
//!
//! Adapters around the capture pipeline: the frame-streams transport, the
//! dnstap envelope decoder, the answer extractor, the output sinks, and
//! SQLite pool management. The pipeline itself (queue, workers, lifecycle)
//! lives in [`capture`].
pub mod capture;
pub mod database;
pub mod extract;
pub mod framing;
pub mod sinks;

pub use capture::CaptureServer;
