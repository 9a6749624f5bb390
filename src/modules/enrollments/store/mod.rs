//! Storage seam for the enrollment core.
//!
//! [`EnrollmentStore`] hands out transactions; everything the enroll and drop
//! paths read or write goes through a [`StoreTx`] so that it happens inside the
//! same transaction that holds the section's row lock.
//!
//! Two implementations exist:
//!
//! - [`postgres::PgStore`]: production store on a `PgPool`
//! - [`memory::MemoryStore`]: in-process store with row locks and deadlock
//!   detection, compiled for tests only

use std::ops::Deref;

use async_trait::async_trait;
use registrar_models::{
    CourseCode, Enrollment, EnrollmentId, EnrollmentStatus, PaymentId, ScheduleEntry, Section,
    SectionAvailability, SectionId, StudentStanding, UserId,
};
use thiserror::Error;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Deadlock victim, serialization failure or lock wait timeout.
    #[error("transaction aborted: {0}")]
    Conflict(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// True when the whole transaction may succeed if resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// A section row read under `FOR UPDATE`.
///
/// Only a [`StoreTx`] can produce one, so holding a `LockedSection` means the
/// owning transaction holds the row lock until it commits or rolls back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedSection {
    section: Section,
}

impl LockedSection {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    pub fn into_inner(self) -> Section {
        self.section
    }
}

impl Deref for LockedSection {
    type Target = Section;

    fn deref(&self) -> &Section {
        &self.section
    }
}

/// A grade recorded against one of the student's past or current courses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRecord {
    pub course_code: CourseCode,
    pub grade: String,
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn student_standing(&self, id: UserId) -> Result<Option<StudentStanding>, StoreError>;

    async fn section_availability(
        &self,
        id: SectionId,
    ) -> Result<Option<SectionAvailability>, StoreError>;

    async fn student_schedule(&self, student: UserId) -> Result<Vec<ScheduleEntry>, StoreError>;
}

/// One open transaction. Dropping it without calling [`StoreTx::commit`]
/// discards every write and releases every lock it holds.
#[async_trait]
pub trait StoreTx: Send {
    /// `SELECT ... FOR UPDATE` on the section row. Returns `None` (and takes
    /// no lock) when the section does not exist.
    async fn lock_section(&mut self, id: SectionId) -> Result<Option<LockedSection>, StoreError>;

    /// `SELECT ... FOR UPDATE` on the user row. Returns false when absent.
    async fn lock_student(&mut self, id: UserId) -> Result<bool, StoreError>;

    /// Direct prerequisites of `course`, sorted by code.
    async fn prerequisites(&mut self, course: &CourseCode) -> Result<Vec<CourseCode>, StoreError>;

    /// Non-null grades the student holds in any of `courses`.
    async fn graded_courses(
        &mut self,
        student: UserId,
        courses: &[CourseCode],
    ) -> Result<Vec<GradeRecord>, StoreError>;

    /// Sections other than `section` that the student is actively enrolled in
    /// during the same term and timeslot.
    async fn conflicting_sections(
        &mut self,
        student: UserId,
        section: &Section,
    ) -> Result<Vec<SectionId>, StoreError>;

    async fn active_enrollment(
        &mut self,
        student: UserId,
        section: SectionId,
    ) -> Result<Option<Enrollment>, StoreError>;

    async fn insert_enrollment(
        &mut self,
        student: UserId,
        section: SectionId,
    ) -> Result<EnrollmentId, StoreError>;

    async fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError>;

    /// Adds `delta` to the section's `enrolled` counter and returns the new
    /// value. Fails with [`StoreError::CheckViolation`] when the result would
    /// leave `0..=capacity`.
    async fn adjust_enrolled(&mut self, section: SectionId, delta: i32) -> Result<i32, StoreError>;

    async fn insert_payment(
        &mut self,
        student: UserId,
        amount_cents: i64,
    ) -> Result<PaymentId, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
