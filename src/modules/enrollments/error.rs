//! Error taxonomy of the enrollment core and its HTTP mapping.
//!
//! | Variant            | Status | `code`              | Retryable |
//! |--------------------|--------|---------------------|-----------|
//! | `NotFound`         | 404    | `not_found`         | no        |
//! | `AccessDenied`     | 401    | `access_denied`     | no        |
//! | `Ineligible`       | 400    | `ineligible`        | no        |
//! | `Full`             | 400    | `full`              | no        |
//! | `ScheduleConflict` | 400    | `schedule_conflict` | no        |
//! | `AlreadyEnrolled`  | 409    | `already_enrolled`  | no        |
//! | `Conflict`         | 409    | `conflict`          | yes       |
//! | `Internal`         | 500    | `internal`          | no        |

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use registrar_core::AppError;
use registrar_models::{CourseCode, SectionId};
use thiserror::Error;

use super::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    UnknownUser,
    NotAStudent,
    Suspended { until: DateTime<Utc> },
}

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error("{}", denial_message(.0))]
    AccessDenied(Denial),

    #[error("Missing prerequisites: {}", join_codes(.missing))]
    Ineligible { missing: Vec<CourseCode> },

    #[error("Section is full")]
    Full { section_id: SectionId },

    #[error("Time conflict with another enrolled course")]
    ScheduleConflict {
        section_id: SectionId,
        conflicting: Vec<SectionId>,
    },

    #[error("Already enrolled in this section")]
    AlreadyEnrolled { section_id: SectionId },

    #[error("Deadlock detected, please retry")]
    Conflict { reason: String },

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

fn denial_message(denial: &Denial) -> String {
    match denial {
        Denial::UnknownUser | Denial::NotAStudent => "Unauthorized".to_string(),
        Denial::Suspended { until } => format!("Account suspended until {}", until.to_rfc3339()),
    }
}

fn join_codes(codes: &[CourseCode]) -> String {
    codes
        .iter()
        .map(CourseCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl EnrollmentError {
    pub fn section_not_found() -> Self {
        EnrollmentError::NotFound { what: "Section" }
    }

    pub fn enrollment_not_found() -> Self {
        EnrollmentError::NotFound { what: "Enrollment" }
    }

    /// Stable identifier used in response bodies, logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            EnrollmentError::NotFound { .. } => "not_found",
            EnrollmentError::AccessDenied(_) => "access_denied",
            EnrollmentError::Ineligible { .. } => "ineligible",
            EnrollmentError::Full { .. } => "full",
            EnrollmentError::ScheduleConflict { .. } => "schedule_conflict",
            EnrollmentError::AlreadyEnrolled { .. } => "already_enrolled",
            EnrollmentError::Conflict { .. } => "conflict",
            EnrollmentError::Internal(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrollmentError::Conflict { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EnrollmentError::NotFound { .. } => StatusCode::NOT_FOUND,
            EnrollmentError::AccessDenied(_) => StatusCode::UNAUTHORIZED,
            EnrollmentError::Ineligible { .. }
            | EnrollmentError::Full { .. }
            | EnrollmentError::ScheduleConflict { .. } => StatusCode::BAD_REQUEST,
            EnrollmentError::AlreadyEnrolled { .. } | EnrollmentError::Conflict { .. } => {
                StatusCode::CONFLICT
            }
            EnrollmentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for EnrollmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => EnrollmentError::Conflict { reason },
            other => EnrollmentError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        let status = err.status();
        let code = err.kind();
        let retryable = err.is_retryable();

        let missing = match &err {
            EnrollmentError::Ineligible { missing } => Some(
                missing
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };

        // Internal details stay in the logs, not in the response body.
        let app_error = match err {
            EnrollmentError::Internal(source) => {
                tracing::error!(error = ?source, "Enrollment transaction failed");
                AppError::new(status, code, anyhow::anyhow!("Internal server error"))
            }
            other => AppError::new(status, code, other),
        };

        let app_error = match missing {
            Some(missing) => app_error.with_detail("missing", missing),
            None => app_error,
        };

        if retryable {
            app_error.retryable()
        } else {
            app_error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EnrollmentError::section_not_found(), 404),
            (EnrollmentError::AccessDenied(Denial::NotAStudent), 401),
            (
                EnrollmentError::Ineligible {
                    missing: vec![CourseCode::new("CS101")],
                },
                400,
            ),
            (EnrollmentError::Full { section_id: SectionId::new(1) }, 400),
            (
                EnrollmentError::ScheduleConflict {
                    section_id: SectionId::new(1),
                    conflicting: vec![SectionId::new(2)],
                },
                400,
            ),
            (EnrollmentError::AlreadyEnrolled { section_id: SectionId::new(1) }, 409),
            (
                EnrollmentError::Conflict {
                    reason: "deadlock detected".into(),
                },
                409,
            ),
            (EnrollmentError::Internal(anyhow::anyhow!("boom")), 500),
        ];

        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{}", err.kind());
        }
    }

    #[test]
    fn test_messages() {
        let err = EnrollmentError::Ineligible {
            missing: vec![CourseCode::new("CS101"), CourseCode::new("MATH120")],
        };
        assert_eq!(err.to_string(), "Missing prerequisites: CS101, MATH120");
        assert_eq!(EnrollmentError::section_not_found().to_string(), "Section not found");
        assert_eq!(
            EnrollmentError::AccessDenied(Denial::UnknownUser).to_string(),
            "Unauthorized"
        );
    }

    #[test]
    fn test_store_conflict_is_retryable() {
        let err = EnrollmentError::from(StoreError::Conflict("40P01".into()));
        assert!(err.is_retryable());

        let err = EnrollmentError::from(StoreError::UniqueViolation("idx".into()));
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn test_app_error_carries_missing_and_retryable() {
        let app: AppError = EnrollmentError::Ineligible {
            missing: vec![CourseCode::new("CS101")],
        }
        .into();
        assert_eq!(app.code, "ineligible");
        assert_eq!(app.details["missing"], serde_json::json!(["CS101"]));
        assert!(!app.retryable);

        let app: AppError = EnrollmentError::Conflict {
            reason: "deadlock".into(),
        }
        .into();
        assert_eq!(app.status, StatusCode::CONFLICT);
        assert!(app.retryable);
    }

    #[test]
    fn test_internal_details_hidden() {
        let app: AppError = EnrollmentError::Internal(anyhow::anyhow!("password=hunter2")).into();
        assert_eq!(app.error.to_string(), "Internal server error");
    }
}
