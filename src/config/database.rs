use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::DatabaseConfig;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await
        .with_context(|| format!("Failed to connect to database {}:{}", config.host, config.port))?;

    tracing::info!(
        "✅ Connected to database {} at {}:{}",
        config.database,
        config.host,
        config.port
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("✅ Database migrations applied");
    Ok(())
}
