//! MessageSink implementations: text dump, JSON lines, SQLite store.
mod json;
mod sqlite;
mod text;

pub use json::JsonSink;
pub use sqlite::SqliteSink;
pub use text::TextSink;
