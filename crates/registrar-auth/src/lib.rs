//! # Registrar Auth
//!
//! Identity claims and JWT utilities for the Registrar API.
//!
//! - [`claims`]: The `(user id, role)` pair carried by an access token
//! - [`jwt`]: Token creation and verification
//!
//! # Example
//!
//! ```ignore
//! use registrar_auth::{create_access_token, verify_token};
//! use registrar_config::JwtConfig;
//! use registrar_models::{UserId, UserRole};
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(UserId::new(7), UserRole::Student, &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, UserRole::Student);
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
