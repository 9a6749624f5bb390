//! # Registrar Models
//!
//! Domain models and DTOs for the Registrar API.
//!
//! # Modules
//!
//! - [`courses`]: Course catalog types
//! - [`enrollments`]: Enrollment rows, statuses, request/response DTOs
//! - [`ids`]: Strongly-typed row identifiers
//! - [`sections`]: Sections, timeslots and capacity views
//! - [`users`]: Roles and the user attributes read by the enrollment core

pub mod courses;
pub mod enrollments;
pub mod ids;
pub mod sections;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use courses::{Course, CourseCode};
pub use enrollments::{
    DropResponse, EnrollRequest, EnrollResponse, Enrollment, EnrollmentReceipt,
    EnrollmentStatus, ScheduleEntry,
};
pub use ids::{EnrollmentId, PaymentId, RoomId, SectionId, TimeslotId, UserId};
pub use sections::{Section, SectionAvailability, Timeslot};
pub use users::{StudentStanding, StudentStatusResponse, UserRole};
