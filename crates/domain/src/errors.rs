use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CaptureError {
    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    OversizedFrame { size: usize, limit: usize },

    #[error("Frame-streams protocol error: {0}")]
    Protocol(String),

    #[error("Content type mismatch: expected \"{expected}\", peer offered {offered:?}")]
    ContentTypeMismatch { expected: String, offered: Vec<String> },

    #[error("Envelope decode error: {0}")]
    Decode(String),

    #[error("DNS message parse error: {0}")]
    DnsParse(String),

    #[error("No data rendering for record \"{0}\"")]
    Render(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage retries exhausted after {attempts} attempt(s)")]
    StorageExhausted { attempts: u32 },

    #[error("Server is shut down")]
    ServerClosed,

    #[error("I/O error: {0}")]
    Io(String),
}

impl CaptureError {
    /// Fatal errors terminate the process rather than one component; the
    /// only one today is an exhausted storage retry budget, where exiting
    /// is preferred over silently dropping buffered answers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::StorageExhausted { .. })
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        CaptureError::Io(e.to_string())
    }
}
