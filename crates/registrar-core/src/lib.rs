//! # Registrar Core
//!
//! Core types shared throughout the Registrar API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//!
//! # Example
//!
//! ```ignore
//! use registrar_core::errors::AppError;
//!
//! let error = AppError::not_found(anyhow::anyhow!("Section not found"));
//! ```

pub mod errors;

// Re-export commonly used types at crate root
pub use errors::{AppError, ErrorResponse};
