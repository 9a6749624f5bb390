//! Request extractors for identity and role checks.
//!
//! # Modules
//!
//! - [`auth`]: Bearer token validation and the student capability gate
//!
//! # Authentication Flow
//!
//! 1. Client sends request with `Authorization: Bearer <token>` header
//! 2. `AuthUser` validates the JWT and extracts claims
//! 3. `RequireStudent` additionally checks the `student` role
//! 4. Handler executes with the caller's user id
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::RequireStudent;
//!
//! async fn enroll(RequireStudent(student_id): RequireStudent) -> impl IntoResponse {
//!     // Only reached by authenticated students
//! }
//! ```

pub mod auth;
