//! Course enrollment.
//!
//! - [`service::EnrollmentService`]: the enroll and drop transactions plus
//!   read-only queries
//! - [`eligibility`]: prerequisite checks
//! - [`ledger`]: the per-section seat counter
//! - [`store`]: the storage seam and its Postgres and in-memory backends
//! - [`error`]: error taxonomy and HTTP mapping
//! - [`retry`]: optional resubmission after a retryable conflict
//! - [`fault`]: lock-order fault injection used by the tests

pub mod controller;
pub mod eligibility;
pub mod error;
pub mod fault;
pub mod ledger;
pub mod model;
pub mod retry;
pub mod router;
pub mod service;
pub mod store;

pub use error::{Denial, EnrollmentError};
pub use service::EnrollmentService;
