//! passivedns Application Layer
//!
//! Ports between the capture pipeline and its adapters. The pipeline only
//! ever talks to sinks through [`ports::MessageSink`], and sinks are built
//! per worker through [`ports::SinkFactory`].
pub mod ports;

pub use ports::{MessageSink, SinkFactory, WorkerId};
