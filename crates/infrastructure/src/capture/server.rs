use std::sync::Arc;
use std::time::Duration;

use crossfire::MAsyncTx;
use passivedns_application::ports::SinkFactory;
use passivedns_domain::CaptureError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::worker;
use crate::framing::FrameStreamReader;

/// Lifecycle state shared between frame sources and shutdown.
///
/// The queue sender lives behind a reader/writer lock: every frame source
/// holds the read side across its accepting-check and send, so shutdown
/// (the write side) can only run between forwards, never during one.
/// Taking the sender out under the write lock closes the queue exactly
/// once; any source that finishes a blocked read afterwards finds the
/// slot empty instead of sending into a closed queue. Workers keep
/// draining while a source waits on a full queue, so the write side
/// cannot block behind a forward forever.
struct ServerState {
    sender: RwLock<Option<MAsyncTx<Vec<u8>>>>,
    shutdown: CancellationToken,
}

impl ServerState {
    async fn forward(&self, frame: Vec<u8>) -> Result<(), CaptureError> {
        let guard = self.sender.read().await;
        match guard.as_ref() {
            Some(sender) => sender
                .send(frame)
                .await
                .map_err(|_| CaptureError::ServerClosed),
            None => Err(CaptureError::ServerClosed),
        }
    }
}

/// Owns the ingestion pipeline: spawns the worker pool at construction,
/// accepts frame sources, and coordinates the drain-and-flush shutdown.
pub struct CaptureServer {
    state: Arc<ServerState>,
    max_frame_size: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
    sources: Mutex<Vec<JoinHandle<()>>>,
}

impl CaptureServer {
    /// Spawns `workers` worker tasks draining a queue of `queue_capacity`
    /// frames. Each worker gets its own sink set from `factory`.
    pub fn new(
        workers: usize,
        queue_capacity: usize,
        max_frame_size: usize,
        factory: Arc<SinkFactory>,
    ) -> Self {
        let (tx, rx) = crossfire::mpmc::bounded_async::<Vec<u8>>(queue_capacity);

        info!(workers, queue_capacity, "Spawning capture workers");
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            handles.push(tokio::spawn(worker::run(id, rx.clone(), factory(id))));
        }

        Self {
            state: Arc::new(ServerState {
                sender: RwLock::new(Some(tx)),
                shutdown: CancellationToken::new(),
            }),
            max_frame_size,
            workers: Mutex::new(handles),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Attaches one frame source: a connected socket (bidirectional) or an
    /// opened replay file (unidirectional). Fails once shutdown has begun.
    pub async fn attach<S>(
        &self,
        stream: S,
        bidirectional: bool,
        idle_timeout: Option<Duration>,
    ) -> Result<(), CaptureError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.state.shutdown.is_cancelled() {
            return Err(CaptureError::ServerClosed);
        }

        let reader = FrameStreamReader::new(stream, bidirectional, self.max_frame_size, idle_timeout);
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(source_loop(reader, state));
        self.sources.lock().await.push(handle);
        Ok(())
    }

    /// Begins shutdown: stops frame sources, closes the queue. Workers
    /// drain already-queued frames, flush their sinks, and exit; call
    /// [`wait`](Self::wait) to block until they have. Idempotent.
    pub async fn shutdown(&self) {
        self.state.shutdown.cancel();
        let mut guard = self.state.sender.write().await;
        if guard.take().is_some() {
            info!("Capture server closed");
        }
    }

    /// Resolves when shutdown has begun. Lets accept loops stop handing
    /// out new connections.
    pub async fn cancelled(&self) {
        self.state.shutdown.cancelled().await;
    }

    /// Waits for every currently attached frame source to exit. Used by
    /// file replay to detect a fully drained input.
    pub async fn wait_sources(&self) {
        let handles = std::mem::take(&mut *self.sources.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Waits for every frame source and worker to exit.
    pub async fn wait(&self) {
        self.wait_sources().await;
        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn source_loop<S>(mut reader: FrameStreamReader<S>, state: Arc<ServerState>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let frame = tokio::select! {
            _ = state.shutdown.cancelled() => break,
            next = reader.next_frame() => match next {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Frame source terminated");
                    break;
                }
            },
        };
        if state.forward(frame).await.is_err() {
            break;
        }
    }
    debug!("Frame source exited");
}
