//! passivedns Domain Layer
pub mod answer;
pub mod config;
pub mod errors;

pub use answer::Answer;
pub use config::{CliOverrides, Config};
pub use errors::CaptureError;

/// Process exit code for storage failures that exhausted their retry
/// budget, distinguishable from ordinary startup failures (exit 1) so
/// operators can alert on data-loss conditions specifically.
pub const EXIT_STORAGE: i32 = 2;
