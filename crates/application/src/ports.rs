mod message_sink;

pub use message_sink::{MessageSink, SinkFactory, WorkerId};
