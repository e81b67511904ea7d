mod database;
mod logging;
mod sinks;

pub use database::init_database;
pub use logging::init_logging;
pub use sinks::sink_factory;
