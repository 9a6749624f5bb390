use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use registrar_config::EnrollmentPolicy;
use registrar_models::{
    CourseCode, EnrollmentReceipt, EnrollmentStatus, ScheduleEntry, SectionAvailability, SectionId,
    StudentStanding, StudentStatusResponse, UserId, UserRole,
};
use tracing::{info, instrument, warn};

use super::eligibility::EligibilityChecker;
use super::error::{Denial, EnrollmentError};
use super::fault::{self, LockInterleave};
use super::ledger::CapacityLedger;
use super::store::{EnrollmentStore, StoreError, StoreTx};
use crate::metrics;

/// Commits on success and rolls back on failure. A failed rollback is logged
/// and the original error is returned; the transaction is dropped either way,
/// which releases its locks.
pub(crate) async fn finish<T>(
    tx: Box<dyn StoreTx>,
    outcome: Result<T, EnrollmentError>,
) -> Result<T, EnrollmentError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Result of a successful drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropReceipt {
    pub section_id: SectionId,
    pub enrolled: i32,
}

/// Eligibility of a student for a course, computed without enrolling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityReport {
    pub course_code: CourseCode,
    pub missing: Vec<CourseCode>,
}

impl EligibilityReport {
    pub fn is_eligible(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Transactional enrollment operations over an [`EnrollmentStore`].
///
/// Every mutating call runs as one store transaction that begins by locking
/// the target section row. Any failure rolls the transaction back before the
/// error is returned, so callers never observe a partial enrollment.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn EnrollmentStore>,
    policy: Arc<EnrollmentPolicy>,
}

impl fmt::Debug for EnrollmentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrollmentService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn EnrollmentStore>, policy: EnrollmentPolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &EnrollmentPolicy {
        &self.policy
    }

    pub fn store(&self) -> &dyn EnrollmentStore {
        self.store.as_ref()
    }

    /// Enrolls `student` into `section_id`.
    ///
    /// Steps, all inside one transaction:
    ///
    /// 1. lock the section row
    /// 2. check prerequisites
    /// 3. check the capacity bound
    /// 4. check for a same-term, same-timeslot enrollment
    /// 5. insert the enrollment
    /// 6. increment the section counter
    /// 7. optionally insert a pending payment
    #[instrument(skip_all, fields(student_id = %student, section_id = %section_id))]
    pub async fn enroll(
        &self,
        student: UserId,
        section_id: SectionId,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let result = self.run_enroll(student, section_id, None).await;
        record_outcome("enroll", &result);
        result
    }

    /// Same as [`enroll`](Self::enroll) with an extra lock step spliced in
    /// after the section lock, for reproducing lock-order deadlocks.
    #[cfg(any(test, feature = "test-utils"))]
    #[instrument(skip_all, fields(student_id = %student, section_id = %section_id))]
    pub async fn enroll_interleaved(
        &self,
        student: UserId,
        section_id: SectionId,
        step: LockInterleave,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let result = self.run_enroll(student, section_id, Some(&step)).await;
        record_outcome("enroll", &result);
        result
    }

    async fn run_enroll(
        &self,
        student: UserId,
        section_id: SectionId,
        step: Option<&LockInterleave>,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        self.ensure_may_enroll(student).await?;

        let mut tx = self.store.begin().await?;
        let outcome = self.admit(tx.as_mut(), student, section_id, step).await;
        let receipt = finish(tx, outcome).await?;

        info!(
            enrollment_id = %receipt.enrollment_id,
            enrolled = receipt.enrolled,
            capacity = receipt.capacity,
            "Student enrolled"
        );
        Ok(receipt)
    }

    async fn admit(
        &self,
        tx: &mut dyn StoreTx,
        student: UserId,
        section_id: SectionId,
        step: Option<&LockInterleave>,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let section = tx
            .lock_section(section_id)
            .await?
            .ok_or_else(EnrollmentError::section_not_found)?;

        if let Some(step) = step {
            fault::interleave(tx, step).await?;
        }

        EligibilityChecker::new(&self.policy)
            .check(tx, student, &section.course_code)
            .await?;

        let hold = CapacityLedger::hold_seat(&section)?;

        let conflicting = tx.conflicting_sections(student, &section).await?;
        if !conflicting.is_empty() {
            return Err(EnrollmentError::ScheduleConflict {
                section_id,
                conflicting,
            });
        }

        let enrollment_id = tx
            .insert_enrollment(student, section_id)
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => EnrollmentError::AlreadyEnrolled { section_id },
                other => other.into(),
            })?;

        let enrolled = CapacityLedger::take_seat(tx, hold).await?;

        let payment_id = if self.policy.charge_fee {
            Some(tx.insert_payment(student, self.policy.fee_cents).await?)
        } else {
            None
        };

        Ok(EnrollmentReceipt {
            enrollment_id,
            section_id,
            enrolled,
            capacity: section.capacity,
            payment_id,
        })
    }

    /// Marks the student's active enrollment in `section_id` as dropped and
    /// gives the seat back.
    #[instrument(skip_all, fields(student_id = %student, section_id = %section_id))]
    pub async fn drop_enrollment(
        &self,
        student: UserId,
        section_id: SectionId,
    ) -> Result<DropReceipt, EnrollmentError> {
        let result = self.run_drop(student, section_id).await;
        record_outcome("drop", &result);
        result
    }

    async fn run_drop(
        &self,
        student: UserId,
        section_id: SectionId,
    ) -> Result<DropReceipt, EnrollmentError> {
        self.ensure_student(student).await?;

        let mut tx = self.store.begin().await?;
        let outcome = Self::withdraw(tx.as_mut(), student, section_id).await;
        let receipt = finish(tx, outcome).await?;

        info!(enrolled = receipt.enrolled, "Enrollment dropped");
        Ok(receipt)
    }

    async fn withdraw(
        tx: &mut dyn StoreTx,
        student: UserId,
        section_id: SectionId,
    ) -> Result<DropReceipt, EnrollmentError> {
        let section = tx
            .lock_section(section_id)
            .await?
            .ok_or_else(EnrollmentError::section_not_found)?;

        let enrollment = tx
            .active_enrollment(student, section_id)
            .await?
            .ok_or_else(EnrollmentError::enrollment_not_found)?;

        tx.set_enrollment_status(enrollment.id, EnrollmentStatus::Dropped)
            .await?;

        // Waitlisted rows never held a seat.
        let enrolled = if enrollment.status == EnrollmentStatus::Enrolled {
            CapacityLedger::release_seat(tx, &section).await?
        } else {
            section.enrolled
        };

        Ok(DropReceipt {
            section_id,
            enrolled,
        })
    }

    /// Lists which prerequisites of `course` the student still lacks.
    #[instrument(skip_all, fields(student_id = %student, course = %course))]
    pub async fn check_eligibility(
        &self,
        student: UserId,
        course: &CourseCode,
    ) -> Result<EligibilityReport, EnrollmentError> {
        self.ensure_student(student).await?;

        let mut tx = self.store.begin().await?;
        let outcome = EligibilityChecker::new(&self.policy)
            .missing(tx.as_mut(), student, course)
            .await;
        let missing = finish(tx, outcome).await?;

        Ok(EligibilityReport {
            course_code: course.clone(),
            missing,
        })
    }

    /// Read-only suspension lookup.
    #[instrument(skip_all, fields(student_id = %student))]
    pub async fn student_status(
        &self,
        student: UserId,
    ) -> Result<StudentStatusResponse, EnrollmentError> {
        let standing = self
            .store
            .student_standing(student)
            .await?
            .ok_or(EnrollmentError::NotFound { what: "Student" })?;

        Ok(StudentStatusResponse {
            student_id: standing.id,
            suspended_until: standing.suspended_until,
            is_suspended: standing.is_suspended_at(Utc::now()),
        })
    }

    #[instrument(skip_all, fields(section_id = %section_id))]
    pub async fn section_availability(
        &self,
        section_id: SectionId,
    ) -> Result<SectionAvailability, EnrollmentError> {
        self.store
            .section_availability(section_id)
            .await?
            .ok_or_else(EnrollmentError::section_not_found)
    }

    #[instrument(skip_all, fields(student_id = %student))]
    pub async fn student_schedule(
        &self,
        student: UserId,
    ) -> Result<Vec<ScheduleEntry>, EnrollmentError> {
        Ok(self.store.student_schedule(student).await?)
    }

    async fn ensure_student(&self, student: UserId) -> Result<StudentStanding, EnrollmentError> {
        let standing = self
            .store
            .student_standing(student)
            .await?
            .ok_or(EnrollmentError::AccessDenied(Denial::UnknownUser))?;

        if standing.role != UserRole::Student {
            return Err(EnrollmentError::AccessDenied(Denial::NotAStudent));
        }
        Ok(standing)
    }

    /// Role and suspension gate. Reads the user row without locking it.
    async fn ensure_may_enroll(&self, student: UserId) -> Result<(), EnrollmentError> {
        let standing = self.ensure_student(student).await?;

        match standing.suspended_until {
            Some(until) if standing.is_suspended_at(Utc::now()) => {
                Err(EnrollmentError::AccessDenied(Denial::Suspended { until }))
            }
            _ => Ok(()),
        }
    }
}

fn record_outcome<T>(operation: &'static str, result: &Result<T, EnrollmentError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => {
            if err.is_retryable() {
                warn!(operation, error = %err, "Enrollment transaction aborted, caller may retry");
            }
            err.kind()
        }
    };
    metrics::track_enrollment_outcome(operation, outcome);
}
