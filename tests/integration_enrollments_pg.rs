//! Runs the enrollment transactions against PostgreSQL.
//!
//! Requires `DATABASE_URL` and `--features postgres-tests`.
#![cfg(feature = "postgres-tests")]

use std::sync::Arc;
use std::time::Duration;

use registrar::modules::enrollments::EnrollmentError;
use registrar::modules::enrollments::EnrollmentService;
use registrar::modules::enrollments::fault::{LockInterleave, LockTarget};
use registrar::modules::enrollments::store::postgres::PgStore;
use registrar::registrar_config::EnrollmentPolicy;
use registrar_models::{CourseCode, SectionId, UserId};
use sqlx::PgPool;

struct PgCampus {
    pool: PgPool,
    service: EnrollmentService,
    cs101: SectionId,
    cs201: SectionId,
    math101: SectionId,
    past_cs101: SectionId,
}

async fn insert_user(pool: &PgPool, role: &str) -> UserId {
    sqlx::query_scalar(
        "INSERT INTO users (name, email, role) VALUES ('Test User', $1, $2) RETURNING id",
    )
    .bind(format!("{}@test.registrar", uuid::Uuid::new_v4()))
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn insert_section(
    pool: &PgPool,
    course: &str,
    term: &str,
    capacity: i32,
    timeslot: i64,
    room: i64,
) -> SectionId {
    sqlx::query_scalar(
        r#"
        INSERT INTO sections (course_code, term, capacity, timeslot_id, room_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(course)
    .bind(term)
    .bind(capacity)
    .bind(timeslot)
    .bind(room)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn setup(pool: PgPool, capacity: i32) -> PgCampus {
    sqlx::query(
        r#"
        INSERT INTO courses (code, title) VALUES
            ('CS101', 'Intro to Programming'),
            ('CS201', 'Data Structures'),
            ('MATH101', 'Calculus I')
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO prerequisites (course_code, prerequisite_code) VALUES ('CS201', 'CS101')")
        .execute(&pool)
        .await
        .unwrap();

    let monday: i64 = sqlx::query_scalar(
        "INSERT INTO timeslots (day, start_time, end_time) VALUES ('Mon', '09:00', '10:00') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let tuesday: i64 = sqlx::query_scalar(
        "INSERT INTO timeslots (day, start_time, end_time) VALUES ('Tue', '09:00', '10:00') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let room: i64 =
        sqlx::query_scalar("INSERT INTO rooms (name, capacity) VALUES ('Hall 1', 200) RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

    let cs101 = insert_section(&pool, "CS101", "2025-FALL", capacity, monday, room).await;
    let cs201 = insert_section(&pool, "CS201", "2025-FALL", capacity, tuesday, room).await;
    let math101 = insert_section(&pool, "MATH101", "2025-FALL", capacity, monday, room).await;
    let past_cs101 = insert_section(&pool, "CS101", "2025-SPRING", 100, monday, room).await;

    let service = EnrollmentService::new(
        Arc::new(PgStore::new(pool.clone())),
        EnrollmentPolicy::default(),
    );

    PgCampus {
        pool,
        service,
        cs101,
        cs201,
        math101,
        past_cs101,
    }
}

impl PgCampus {
    async fn enrolled(&self, section: SectionId) -> i32 {
        sqlx::query_scalar("SELECT enrolled FROM sections WHERE id = $1")
            .bind(section)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn counted(&self, section: SectionId) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE section_id = $1 AND status = 'enrolled'",
        )
        .bind(section)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    async fn payments(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn assert_consistent(&self) {
        for section in [self.cs101, self.cs201, self.math101, self.past_cs101] {
            assert_eq!(self.enrolled(section).await as i64, self.counted(section).await);
        }
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enroll_and_drop(pool: PgPool) {
    let c = setup(pool, 30).await;
    let student = insert_user(&c.pool, "student").await;

    let receipt = c.service.enroll(student, c.cs101).await.unwrap();
    assert_eq!(receipt.enrolled, 1);
    assert!(receipt.payment_id.is_some());
    assert_eq!(c.payments().await, 1);

    let schedule = c.service.student_schedule(student).await.unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].course_code, CourseCode::new("CS101"));

    let receipt = c.service.drop_enrollment(student, c.cs101).await.unwrap();
    assert_eq!(receipt.enrolled, 0);
    c.assert_consistent().await;

    c.service.enroll(student, c.cs101).await.unwrap();
    assert_eq!(c.enrolled(c.cs101).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rejections_roll_back(pool: PgPool) {
    let c = setup(pool, 1).await;
    let a = insert_user(&c.pool, "student").await;
    let b = insert_user(&c.pool, "student").await;

    c.service.enroll(a, c.cs101).await.unwrap();

    let err = c.service.enroll(b, c.cs101).await.unwrap_err();
    assert!(matches!(err, EnrollmentError::Full { .. }), "{err:?}");

    let err = c.service.enroll(a, c.math101).await.unwrap_err();
    assert!(matches!(err, EnrollmentError::ScheduleConflict { .. }), "{err:?}");

    let err = c.service.enroll(a, c.cs201).await.unwrap_err();
    assert!(matches!(err, EnrollmentError::Ineligible { .. }), "{err:?}");

    let err = c.service.enroll(a, c.cs101).await.unwrap_err();
    assert!(matches!(err, EnrollmentError::AlreadyEnrolled { .. }), "{err:?}");

    let instructor = insert_user(&c.pool, "instructor").await;
    let err = c.service.enroll(instructor, c.cs201).await.unwrap_err();
    assert_eq!(err.kind(), "access_denied");

    assert_eq!(c.payments().await, 1);
    c.assert_consistent().await;
}

#[sqlx::test(migrations = "./migrations")]
async fn test_graded_prerequisite(pool: PgPool) {
    let c = setup(pool, 30).await;
    let student = insert_user(&c.pool, "student").await;

    c.service.enroll(student, c.past_cs101).await.unwrap();
    sqlx::query("UPDATE enrollments SET grade = 'F' WHERE student_id = $1 AND section_id = $2")
        .bind(student)
        .bind(c.past_cs101)
        .execute(&c.pool)
        .await
        .unwrap();

    let err = c.service.enroll(student, c.cs201).await.unwrap_err();
    assert_eq!(err.to_string(), "Missing prerequisites: CS101");

    sqlx::query("UPDATE enrollments SET grade = 'B' WHERE student_id = $1 AND section_id = $2")
        .bind(student)
        .bind(c.past_cs101)
        .execute(&c.pool)
        .await
        .unwrap();

    c.service.enroll(student, c.cs201).await.unwrap();
    c.assert_consistent().await;
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_last_seat(pool: PgPool) {
    let c = setup(pool, 1).await;
    let a = insert_user(&c.pool, "student").await;
    let b = insert_user(&c.pool, "student").await;

    let (ra, rb) = tokio::join!(c.service.enroll(a, c.cs101), c.service.enroll(b, c.cs101));

    let results = [ra, rb];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(err, EnrollmentError::Full { .. }), "{err:?}");
    assert_eq!(c.enrolled(c.cs101).await, 1);
    c.assert_consistent().await;
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deadlock_surfaces_as_conflict(pool: PgPool) {
    let c = setup(pool, 30).await;
    let a = insert_user(&c.pool, "student").await;
    let b = insert_user(&c.pool, "student").await;
    let pause = Duration::from_millis(200);

    let (ra, rb) = tokio::join!(
        c.service.enroll_interleaved(
            a,
            c.cs101,
            LockInterleave {
                pause,
                also_lock: LockTarget::Section(c.math101),
            },
        ),
        c.service.enroll_interleaved(
            b,
            c.math101,
            LockInterleave {
                pause,
                also_lock: LockTarget::Section(c.cs101),
            },
        ),
    );

    let results = [ra, rb];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(err, EnrollmentError::Conflict { .. }), "{err:?}");
    assert_eq!(err.status().as_u16(), 409);

    assert_eq!(
        c.enrolled(c.cs101).await + c.enrolled(c.math101).await,
        1,
        "only the survivor's enrollment may commit"
    );
    assert_eq!(c.payments().await, 1);
    c.assert_consistent().await;
}
