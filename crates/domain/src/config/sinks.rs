use serde::{Deserialize, Serialize};

/// Which output sinks each worker is given. All default to off; enabling
/// none is allowed and turns the daemon into a pure drain (useful when
/// smoke-testing a resolver's dnstap output).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SinkConfig {
    /// Dump every decoded message to stdout in debug format.
    #[serde(default)]
    pub text: bool,

    /// One JSON object per extracted answer on stdout.
    #[serde(default)]
    pub json: bool,

    /// Batched writes to the answers table.
    #[serde(default)]
    pub sqlite: bool,
}

impl SinkConfig {
    pub fn any_enabled(&self) -> bool {
        self.text || self.json || self.sqlite
    }
}
