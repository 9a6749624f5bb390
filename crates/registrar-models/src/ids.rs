//! Strongly-typed ID newtypes for domain entities.
//!
//! Rows are keyed by `BIGSERIAL` columns. Wrapping each key in its own type
//! keeps a `SectionId` from being passed where a `UserId` is expected.
//!
//! # Example
//!
//! ```ignore
//! use registrar_models::ids::{SectionId, UserId};
//!
//! fn enroll(student: UserId, section: SectionId) { /* ... */ }
//!
//! enroll(UserId::new(7), SectionId::new(42));    // OK
//! // enroll(SectionId::new(42), UserId::new(7)); // Compile error
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        #[schema(value_type = i64)]
        pub struct $name(pub i64);

        impl $name {
            #[inline]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            #[inline]
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Strongly-typed ID for User entities (students, instructors, admins).
    UserId
);

define_id!(
    /// Strongly-typed ID for Section entities.
    SectionId
);

define_id!(
    /// Strongly-typed ID for Enrollment entities.
    EnrollmentId
);

define_id!(
    /// Strongly-typed ID for Timeslot entities.
    TimeslotId
);

define_id!(
    /// Strongly-typed ID for Room entities.
    RoomId
);

define_id!(
    /// Strongly-typed ID for Payment entities.
    PaymentId
);
