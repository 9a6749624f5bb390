//! Database connection settings.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
//! - `DATABASE_ACQUIRE_TIMEOUT_SECS`: how long a request waits for a pooled connection (default: 5)
//! - `DATABASE_LOCK_TIMEOUT_MS`: per-session `lock_timeout`; `0` leaves row-lock waits unbounded
//!   and relies on the server's deadlock detector (default: 0)
//! - `RUN_MIGRATIONS`: apply embedded migrations at startup (default: true)

use anyhow::Context;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub lock_timeout_ms: u64,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(
                env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
            lock_timeout_ms: env::var("DATABASE_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            run_migrations: env::var("RUN_MIGRATIONS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        })
    }

    /// Settings for a known URL with defaults for everything else.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            lock_timeout_ms: 0,
            run_migrations: true,
        }
    }
}
