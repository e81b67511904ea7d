mod capture;
mod database;
mod errors;
mod logging;
mod root;
mod sinks;

pub use capture::CaptureConfig;
pub use database::DatabaseConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use sinks::SinkConfig;
