use std::sync::Arc;

use passivedns_application::ports::{MessageSink, SinkFactory};
use passivedns_domain::Config;
use passivedns_infrastructure::sinks::{JsonSink, SqliteSink, TextSink};
use sqlx::SqlitePool;
use tracing::info;

/// Builds the per-worker sink factory from the enabled sink set. Each
/// worker gets fresh instances; only the pool handle is shared.
pub fn sink_factory(config: &Config, pool: Option<SqlitePool>) -> Arc<SinkFactory> {
    let sinks = config.sinks.clone();
    let database = config.database.clone();

    info!(
        text = sinks.text,
        json = sinks.json,
        sqlite = sinks.sqlite,
        "Registering sinks"
    );

    Arc::new(move |worker| {
        let mut set: Vec<Box<dyn MessageSink>> = Vec::new();
        if sinks.text {
            set.push(Box::new(TextSink::stdout()));
        }
        if sinks.json {
            set.push(Box::new(JsonSink::stdout()));
        }
        if let Some(pool) = pool.clone() {
            set.push(Box::new(SqliteSink::new(pool, &database, worker)));
        }
        set
    })
}
