//! # Registrar Config
//!
//! Configuration types for the Registrar API.
//!
//! Every structure is loaded from environment variables with sensible defaults:
//!
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`database`]: PostgreSQL pool settings
//! - [`enrollment`]: Enrollment policy (failing grades, enrollment fee)
//! - [`jwt`]: JWT authentication configuration
//! - [`server`]: Listen address and metrics port
//!
//! # Example
//!
//! ```ignore
//! use registrar_config::{DatabaseConfig, EnrollmentPolicy, JwtConfig};
//!
//! let database = DatabaseConfig::from_env()?;
//! let policy = EnrollmentPolicy::from_env();
//! let jwt_config = JwtConfig::from_env();
//! ```

pub mod cors;
pub mod database;
pub mod enrollment;
pub mod jwt;
pub mod server;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use enrollment::EnrollmentPolicy;
pub use jwt::JwtConfig;
pub use server::ServerConfig;
