use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registrar_models::{
    CourseCode, Enrollment, EnrollmentId, EnrollmentStatus, PaymentId, ScheduleEntry, Section,
    SectionAvailability, SectionId, StudentStanding, UserId, UserRole,
};
use sqlx::{PgPool, Postgres, Transaction};

use super::{EnrollmentStore, GradeRecord, LockedSection, StoreError, StoreTx};

/// PostgreSQL error codes that abort a transaction but leave the request
/// safe to resubmit.
const DEADLOCK_DETECTED: &str = "40P01";
const SERIALIZATION_FAILURE: &str = "40001";
const LOCK_NOT_AVAILABLE: &str = "55P03";

fn is_transient_sqlstate(code: &str) -> bool {
    matches!(
        code,
        DEADLOCK_DETECTED | SERIALIZATION_FAILURE | LOCK_NOT_AVAILABLE
    )
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message().to_string();

            if db_err.code().as_deref().is_some_and(is_transient_sqlstate) {
                return StoreError::Conflict(message);
            }
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(message);
            }
            if db_err.is_check_violation() {
                return StoreError::CheckViolation(message);
            }
        }

        StoreError::Backend(anyhow::Error::new(err))
    }
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EnrollmentStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn student_standing(&self, id: UserId) -> Result<Option<StudentStanding>, StoreError> {
        let row = sqlx::query_as::<_, (UserId, String, Option<DateTime<Utc>>)>(
            "SELECT id, role, suspended_until FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, role, suspended_until)| {
            let role = role
                .parse::<UserRole>()
                .map_err(|e| StoreError::Backend(anyhow!(e)))?;
            Ok(StudentStanding {
                id,
                role,
                suspended_until,
            })
        })
        .transpose()
    }

    async fn section_availability(
        &self,
        id: SectionId,
    ) -> Result<Option<SectionAvailability>, StoreError> {
        let availability = sqlx::query_as::<_, SectionAvailability>(
            r#"
            SELECT id AS section_id, course_code, term, section_number, capacity, enrolled,
                   GREATEST(capacity - enrolled, 0) AS seats_remaining
            FROM sections
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(availability)
    }

    async fn student_schedule(&self, student: UserId) -> Result<Vec<ScheduleEntry>, StoreError> {
        let entries = sqlx::query_as::<_, ScheduleEntry>(
            r#"
            SELECT s.id AS section_id, c.code AS course_code, c.title, c.credits, s.term,
                   s.section_number, t.day, t.start_time, t.end_time, r.name AS room_name
            FROM enrollments e
            JOIN sections s ON e.section_id = s.id
            JOIN courses c ON s.course_code = c.code
            JOIN timeslots t ON s.timeslot_id = t.id
            JOIN rooms r ON s.room_id = r.id
            WHERE e.student_id = $1 AND e.status = 'enrolled'
            ORDER BY s.term, t.day, t.start_time
            "#,
        )
        .bind(student)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_section(&mut self, id: SectionId) -> Result<Option<LockedSection>, StoreError> {
        let section = sqlx::query_as::<_, Section>(
            r#"
            SELECT id, course_code, term, section_number, capacity, enrolled, timeslot_id, room_id
            FROM sections
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(section.map(LockedSection::new))
    }

    async fn lock_student(&mut self, id: UserId) -> Result<bool, StoreError> {
        let locked = sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(locked.is_some())
    }

    async fn prerequisites(&mut self, course: &CourseCode) -> Result<Vec<CourseCode>, StoreError> {
        let codes = sqlx::query_scalar::<_, CourseCode>(
            r#"
            SELECT prerequisite_code
            FROM prerequisites
            WHERE course_code = $1
            ORDER BY prerequisite_code
            "#,
        )
        .bind(course)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(codes)
    }

    async fn graded_courses(
        &mut self,
        student: UserId,
        courses: &[CourseCode],
    ) -> Result<Vec<GradeRecord>, StoreError> {
        let codes: Vec<&str> = courses.iter().map(CourseCode::as_str).collect();

        let rows = sqlx::query_as::<_, (CourseCode, String)>(
            r#"
            SELECT s.course_code, e.grade
            FROM enrollments e
            JOIN sections s ON e.section_id = s.id
            WHERE e.student_id = $1
              AND e.grade IS NOT NULL
              AND s.course_code = ANY($2)
            "#,
        )
        .bind(student)
        .bind(&codes)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(course_code, grade)| GradeRecord { course_code, grade })
            .collect())
    }

    async fn conflicting_sections(
        &mut self,
        student: UserId,
        section: &Section,
    ) -> Result<Vec<SectionId>, StoreError> {
        let ids = sqlx::query_scalar::<_, SectionId>(
            r#"
            SELECT s.id
            FROM enrollments e
            JOIN sections s ON e.section_id = s.id
            WHERE e.student_id = $1
              AND e.status = 'enrolled'
              AND s.term = $2
              AND s.timeslot_id = $3
              AND s.id <> $4
            ORDER BY s.id
            "#,
        )
        .bind(student)
        .bind(&section.term)
        .bind(section.timeslot_id)
        .bind(section.id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn active_enrollment(
        &mut self,
        student: UserId,
        section: SectionId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query_as::<_, (EnrollmentId, String, Option<String>)>(
            r#"
            SELECT id, status, grade
            FROM enrollments
            WHERE student_id = $1 AND section_id = $2 AND status <> 'dropped'
            FOR UPDATE
            "#,
        )
        .bind(student)
        .bind(section)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|(id, status, grade)| {
            let status = status
                .parse::<EnrollmentStatus>()
                .map_err(|e| StoreError::Backend(anyhow!(e)))?;
            Ok(Enrollment {
                id,
                student_id: student,
                section_id: section,
                status,
                grade,
            })
        })
        .transpose()
    }

    async fn insert_enrollment(
        &mut self,
        student: UserId,
        section: SectionId,
    ) -> Result<EnrollmentId, StoreError> {
        let id = sqlx::query_scalar::<_, EnrollmentId>(
            r#"
            INSERT INTO enrollments (student_id, section_id, status)
            VALUES ($1, $2, 'enrolled')
            RETURNING id
            "#,
        )
        .bind(student)
        .bind(section)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE enrollments SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(anyhow!("Enrollment {id} vanished")));
        }
        Ok(())
    }

    async fn adjust_enrolled(&mut self, section: SectionId, delta: i32) -> Result<i32, StoreError> {
        let enrolled = sqlx::query_scalar::<_, i32>(
            "UPDATE sections SET enrolled = enrolled + $2 WHERE id = $1 RETURNING enrolled",
        )
        .bind(section)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        enrolled.ok_or_else(|| StoreError::Backend(anyhow!("Section {section} vanished")))
    }

    async fn insert_payment(
        &mut self,
        student: UserId,
        amount_cents: i64,
    ) -> Result<PaymentId, StoreError> {
        let id = sqlx::query_scalar::<_, PaymentId>(
            r#"
            INSERT INTO payments (student_id, amount_cents, status)
            VALUES ($1, $2, 'pending')
            RETURNING id
            "#,
        )
        .bind(student)
        .bind(amount_cents)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .context("Failed to roll back transaction")?;
        Ok(())
    }
}
