use passivedns_domain::Config;
use passivedns_infrastructure::database::{create_pool, ensure_schema};
use sqlx::SqlitePool;
use tracing::{error, info};

pub async fn init_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let database_url = format!("sqlite:{}", config.database.path);
    info!("Initializing database: {}", database_url);

    let pool = create_pool(&database_url).await.map_err(|e| {
        error!("Failed to open answers database: {}", e);
        anyhow::anyhow!(e)
    })?;

    ensure_schema(&pool).await.map_err(|e| {
        error!("Failed to apply answers schema: {}", e);
        anyhow::anyhow!(e)
    })?;

    info!(
        path = %config.database.path,
        batch_size = config.database.flush_batch_size,
        "Answers database ready"
    );
    Ok(pool)
}
