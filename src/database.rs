use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

/// Postgres pool with the schema migrations already applied. Constructing a
/// `Database` that has not been migrated is not possible, so every consumer
/// can assume the tables exist.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str, pool_size: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&pool).await?;
        info!("Migrations completed");

        Ok(Database { pool })
    }
}
