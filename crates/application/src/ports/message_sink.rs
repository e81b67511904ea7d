use async_trait::async_trait;
use passivedns_domain::CaptureError;
use passivedns_proto::Message;

/// Identity of the worker a sink set belongs to, for labeling output and
/// log lines.
pub type WorkerId = usize;

/// A consumer of decoded dnstap messages with an explicit flush lifecycle.
///
/// Every sink instance is owned by exactly one worker, which calls
/// `handle` for each message it dequeues, in dequeue order, and `close`
/// exactly once when the worker exits. Implementations may therefore keep
/// internal buffers without locking. Sinks see every message, relevant or
/// not, and must ignore the ones they do not care about. `handle` must not
/// block indefinitely; it stalls the owning worker's share of the queue.
#[async_trait]
pub trait MessageSink: Send {
    async fn handle(&mut self, message: &Message) -> Result<(), CaptureError>;

    /// Flush buffered state. Called exactly once, after the last `handle`.
    async fn close(&mut self) -> Result<(), CaptureError>;

    fn name(&self) -> &'static str;
}

/// Builds one worker's private sink set. Receives the worker's identity so
/// sinks can be labeled or partitioned per worker. Stateful sinks must not
/// be shared between workers; return fresh instances on every call.
pub type SinkFactory = dyn Fn(WorkerId) -> Vec<Box<dyn MessageSink>> + Send + Sync;
