//! User roles and the attributes the enrollment core reads from a user row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::ids::UserId;

/// System roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Instructor => "instructor",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "instructor" => Ok(UserRole::Instructor),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// The access-gate attributes of a user, read without taking any lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentStanding {
    pub id: UserId,
    pub role: UserRole,
    pub suspended_until: Option<DateTime<Utc>>,
}

impl StudentStanding {
    /// A suspension is active while `suspended_until` lies in the future.
    pub fn is_suspended_at(&self, now: DateTime<Utc>) -> bool {
        self.suspended_until.is_some_and(|until| until > now)
    }
}

/// Response for the student status query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentStatusResponse {
    pub student_id: UserId,
    pub suspended_until: Option<DateTime<Utc>>,
    pub is_suspended: bool,
}
