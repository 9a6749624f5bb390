//! Enrollment models and DTOs.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::courses::CourseCode;
use crate::ids::{EnrollmentId, PaymentId, SectionId, UserId};

/// Lifecycle status of an enrollment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Enrolled,
    Dropped,
    Waitlisted,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Dropped => "dropped",
            EnrollmentStatus::Waitlisted => "waitlisted",
        }
    }

    /// Non-dropped rows take part in the (student, section) uniqueness rule.
    pub fn is_active(&self) -> bool {
        !matches!(self, EnrollmentStatus::Dropped)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(EnrollmentStatus::Enrolled),
            "dropped" => Ok(EnrollmentStatus::Dropped),
            "waitlisted" => Ok(EnrollmentStatus::Waitlisted),
            other => Err(format!("Unknown enrollment status: {}", other)),
        }
    }
}

/// An enrollment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: UserId,
    pub section_id: SectionId,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
}

/// Request body for enrolling the authenticated student.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EnrollRequest {
    /// Section to enroll in
    #[validate(range(min = 1))]
    pub section_id: i64,
}

/// What a successful enrollment committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EnrollmentReceipt {
    pub enrollment_id: EnrollmentId,
    pub section_id: SectionId,
    /// Section counter after the commit
    pub enrolled: i32,
    pub capacity: i32,
    /// Pending fee record created with the enrollment, if fees are charged
    pub payment_id: Option<PaymentId>,
}

/// Response body for a successful enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollResponse {
    #[schema(example = "Enrolled successfully")]
    pub message: String,
    pub enrollment_id: EnrollmentId,
    pub section_id: SectionId,
    pub seats_remaining: i32,
}

impl From<EnrollmentReceipt> for EnrollResponse {
    fn from(receipt: EnrollmentReceipt) -> Self {
        Self {
            message: "Enrolled successfully".to_string(),
            enrollment_id: receipt.enrollment_id,
            section_id: receipt.section_id,
            seats_remaining: (receipt.capacity - receipt.enrolled).max(0),
        }
    }
}

/// Response body for a dropped enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DropResponse {
    #[schema(example = "Enrollment dropped")]
    pub message: String,
    pub section_id: SectionId,
}

/// One line of a student's weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScheduleEntry {
    pub section_id: SectionId,
    pub course_code: CourseCode,
    pub title: String,
    pub credits: i32,
    pub term: String,
    pub section_number: i32,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("enrolled".parse::<EnrollmentStatus>().unwrap(), EnrollmentStatus::Enrolled);
        assert_eq!("dropped".parse::<EnrollmentStatus>().unwrap(), EnrollmentStatus::Dropped);
        assert!("graduated".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn test_only_dropped_is_inactive() {
        assert!(EnrollmentStatus::Enrolled.is_active());
        assert!(EnrollmentStatus::Waitlisted.is_active());
        assert!(!EnrollmentStatus::Dropped.is_active());
    }

    #[test]
    fn test_enroll_request_validation() {
        let valid: EnrollRequest = serde_json::from_str(r#"{"section_id": 3}"#).unwrap();
        assert!(valid.validate().is_ok());

        let invalid = EnrollRequest { section_id: 0 };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_response_from_receipt() {
        let receipt = EnrollmentReceipt {
            enrollment_id: EnrollmentId::new(10),
            section_id: SectionId::new(2),
            enrolled: 29,
            capacity: 30,
            payment_id: None,
        };
        let response = EnrollResponse::from(receipt);
        assert_eq!(response.message, "Enrolled successfully");
        assert_eq!(response.seats_remaining, 1);
    }
}
