use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Worker task count. 0 means one per logical CPU.
    #[serde(default)]
    pub workers: usize,

    /// Ingestion queue capacity. 0 means eight slots per worker.
    #[serde(default)]
    pub queue_capacity: usize,

    /// Upper bound on one dnstap frame. A peer sending a larger frame is
    /// disconnected. 96 KiB fits a maximum-size DNS message plus metadata.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Idle read timeout on socket connections, in seconds. 0 disables it.
    /// File replay never times out.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl CaptureConfig {
    /// Worker count with the 0 = auto rule applied.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Queue capacity with the 0 = auto rule applied.
    pub fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity > 0 {
            self.queue_capacity
        } else {
            8 * self.effective_workers()
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 0,
            max_frame_size: default_max_frame_size(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

fn default_max_frame_size() -> usize {
    96 * 1024
}

fn default_idle_timeout_secs() -> u64 {
    15
}
