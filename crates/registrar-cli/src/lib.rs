//! # Registrar CLI
//!
//! Database seeding utilities for Registrar testing and development.
//!
//! This library crate provides the seeding functionality used by the CLI binary.
//!
//! ## Usage
//!
//! ```ignore
//! use registrar_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(200).with_courses(20);
//! seed_all(&pool, &config).await?;
//! ```

pub mod seeder;
