//! # Registrar DB
//!
//! Database pool construction and schema migrations for the Registrar API.
//!
//! The pool is built once at startup from a [`DatabaseConfig`] and handed to
//! the services that need it; nothing in the application reaches for a
//! process-wide connection.
//!
//! # Example
//!
//! ```ignore
//! use registrar_config::DatabaseConfig;
//! use registrar_db::{init_db_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_db_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

use anyhow::Context;
use registrar_config::DatabaseConfig;
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Builds the PostgreSQL connection pool.
///
/// When `lock_timeout_ms` is non-zero every pooled session gets
/// `SET lock_timeout`, so a blocked `SELECT ... FOR UPDATE` fails with
/// `55P03` instead of waiting for the holder indefinitely.
///
/// # Errors
///
/// Returns an error when the database cannot be reached.
pub async fn init_db_pool(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let lock_timeout_ms = config.lock_timeout_ms;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                if lock_timeout_ms > 0 {
                    conn.execute(format!("SET lock_timeout = {lock_timeout_ms}").as_str())
                        .await?;
                }
                Ok(())
            })
        })
        .connect(&config.url)
        .await
        .context("Failed to connect to database")?;

    info!(
        max_connections = config.max_connections,
        lock_timeout_ms, "Database pool initialized"
    );

    Ok(pool)
}

/// Applies the embedded migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database migrations applied");
    Ok(())
}
