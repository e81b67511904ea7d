use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Opens (creating if missing) the answers database. WAL keeps concurrent
/// worker flushes from serializing on the journal.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Applies the answers schema idempotently. The daemon must be able to
/// reopen and append to any existing answers database, so this never
/// alters existing tables; the UNIQUE index is what makes replays and
/// re-deliveries safe.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS answers (
            time TEXT NOT NULL,
            id INTEGER NOT NULL,
            name TEXT NOT NULL,
            ttl INTEGER NOT NULL,
            class TEXT NOT NULL,
            type TEXT NOT NULL,
            data TEXT NOT NULL,
            UNIQUE (time, id, name, ttl, class, type, data)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_answers_name ON answers(name)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_answers_data ON answers(data)")
        .execute(pool)
        .await?;

    Ok(())
}
