use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Answers buffered per worker before a flush is attempted.
    #[serde(default = "default_flush_batch_size")]
    pub flush_batch_size: usize,

    /// Transaction attempts before a threshold flush gives up and the
    /// process exits. Retries are spaced by `flush_retry_delay_ms`.
    #[serde(default = "default_flush_max_attempts")]
    pub flush_max_attempts: u32,

    #[serde(default = "default_flush_retry_delay_ms")]
    pub flush_retry_delay_ms: u64,

    /// Transaction attempts for the final flush on close. No delay between
    /// attempts; shutdown should not hang for a minute on a wedged disk.
    #[serde(default = "default_close_max_attempts")]
    pub close_max_attempts: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            flush_batch_size: default_flush_batch_size(),
            flush_max_attempts: default_flush_max_attempts(),
            flush_retry_delay_ms: default_flush_retry_delay_ms(),
            close_max_attempts: default_close_max_attempts(),
        }
    }
}

fn default_db_path() -> String {
    "passivedns.db".to_string()
}

fn default_flush_batch_size() -> usize {
    32
}

fn default_flush_max_attempts() -> u32 {
    30
}

fn default_flush_retry_delay_ms() -> u64 {
    2_000
}

fn default_close_max_attempts() -> u32 {
    8
}
