//! Database module

#[cfg(test)]
pub mod memory;
pub mod queries;
pub mod store;

pub use store::{PgRouteStore, RouteAggregates, RouteStore, StatusChange, WindowOrderViolation};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    let migrator = sqlx::migrate!("./migrations");
    debug!(
        "Embedded migration versions: {:?}",
        migrator.iter().map(|m| m.version).collect::<Vec<_>>()
    );

    migrator
        .run(pool)
        .await
        .context("Failed to apply database migrations")?;

    info!("Database migrations complete");
    Ok(())
}
