use std::sync::Arc;

use anyhow::Context;
use registrar_config::{CorsConfig, DatabaseConfig, EnrollmentPolicy, JwtConfig};
use registrar_db::{init_db_pool, run_migrations};

use crate::modules::enrollments::EnrollmentService;
use crate::modules::enrollments::store::postgres::PgStore;

#[derive(Clone, Debug)]
pub struct AppState {
    pub enrollments: EnrollmentService,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
}

/// Builds the store handle and services from the environment.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let database_config = DatabaseConfig::from_env().context("Invalid database configuration")?;
    let pool = init_db_pool(&database_config).await?;

    if database_config.run_migrations {
        run_migrations(&pool).await?;
    }

    let store = PgStore::new(pool);

    Ok(AppState {
        enrollments: EnrollmentService::new(Arc::new(store), EnrollmentPolicy::from_env()),
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    })
}
