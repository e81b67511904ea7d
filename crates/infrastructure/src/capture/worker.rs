use crossfire::MAsyncRx;
use passivedns_application::ports::{MessageSink, WorkerId};
use passivedns_domain::EXIT_STORAGE;
use passivedns_proto::{Dnstap, DnstapType};
use prost::Message as _;
use tracing::{debug, error, warn};

/// One worker loop: dequeue, decode, fan out to this worker's private
/// sinks in registration order.
///
/// A frame that fails to decode terminates the worker permanently — the
/// pool sheds one worker of capacity for the rest of the run rather than
/// guessing at resynchronization. Whatever ends the loop, every sink is
/// closed exactly once so buffered state flushes.
pub(super) async fn run(
    id: WorkerId,
    queue: MAsyncRx<Vec<u8>>,
    mut sinks: Vec<Box<dyn MessageSink>>,
) {
    debug!(worker = id, sinks = sinks.len(), "Worker started");

    while let Ok(frame) = queue.recv().await {
        let envelope = match Dnstap::decode(frame.as_slice()) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(worker = id, error = %e, "Envelope decode failed, worker terminating");
                break;
            }
        };
        if envelope.r#type() != DnstapType::Message {
            continue;
        }
        let Some(message) = envelope.message else {
            continue;
        };

        for sink in sinks.iter_mut() {
            if let Err(e) = sink.handle(&message).await {
                if e.is_fatal() {
                    error!(worker = id, sink = sink.name(), error = %e, "Fatal sink error");
                    std::process::exit(EXIT_STORAGE);
                }
                warn!(worker = id, sink = sink.name(), error = %e, "Sink error");
            }
        }
    }

    for sink in sinks.iter_mut() {
        if let Err(e) = sink.close().await {
            if e.is_fatal() {
                error!(worker = id, sink = sink.name(), error = %e, "Fatal sink error on close");
                std::process::exit(EXIT_STORAGE);
            }
            warn!(worker = id, sink = sink.name(), error = %e, "Sink close error");
        }
    }
    debug!(worker = id, "Worker terminated");
}
