pub mod enrollments;
pub mod students;

pub use self::enrollments::{EnrollmentError, EnrollmentService};
