//! Prerequisite eligibility.
//!
//! A course's prerequisites are satisfied when the student holds a passing
//! grade in every direct prerequisite. Prerequisites of prerequisites are not
//! followed.

use std::collections::HashSet;

use registrar_config::EnrollmentPolicy;
use registrar_models::{CourseCode, UserId};
use tracing::debug;

use super::error::EnrollmentError;
use super::store::{GradeRecord, StoreTx};

pub struct EligibilityChecker<'a> {
    policy: &'a EnrollmentPolicy,
}

impl<'a> EligibilityChecker<'a> {
    pub fn new(policy: &'a EnrollmentPolicy) -> Self {
        Self { policy }
    }

    /// Fails with [`EnrollmentError::Ineligible`] listing every unmet
    /// prerequisite. Runs on the caller's transaction.
    pub async fn check(
        &self,
        tx: &mut dyn StoreTx,
        student: UserId,
        course: &CourseCode,
    ) -> Result<(), EnrollmentError> {
        let missing = self.missing(tx, student, course).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            debug!(%student, %course, ?missing, "Prerequisites not met");
            Err(EnrollmentError::Ineligible { missing })
        }
    }

    pub async fn missing(
        &self,
        tx: &mut dyn StoreTx,
        student: UserId,
        course: &CourseCode,
    ) -> Result<Vec<CourseCode>, EnrollmentError> {
        let prerequisites = tx.prerequisites(course).await?;
        if prerequisites.is_empty() {
            return Ok(Vec::new());
        }

        let grades = tx.graded_courses(student, &prerequisites).await?;
        Ok(missing_prerequisites(&prerequisites, &grades, self.policy))
    }
}

/// Prerequisites without at least one passing grade, in input order.
pub fn missing_prerequisites(
    prerequisites: &[CourseCode],
    grades: &[GradeRecord],
    policy: &EnrollmentPolicy,
) -> Vec<CourseCode> {
    let passed: HashSet<&CourseCode> = grades
        .iter()
        .filter(|record| policy.is_passing(&record.grade))
        .map(|record| &record.course_code)
        .collect();

    prerequisites
        .iter()
        .filter(|code| !passed.contains(code))
        .cloned()
        .collect()
}
