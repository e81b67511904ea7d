use passivedns_domain::Config;
use tracing_subscriber::EnvFilter;

/// Operator output goes to stderr; stdout belongs to the text and JSON
/// sinks. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
