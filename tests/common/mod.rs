use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use chrono::NaiveTime;
use http_body_util::BodyExt;
use registrar::modules::enrollments::EnrollmentService;
use registrar::modules::enrollments::store::memory::MemoryStore;
use registrar::registrar_auth::create_access_token;
use registrar::registrar_config::{CorsConfig, EnrollmentPolicy, JwtConfig};
use registrar::router::init_router;
use registrar::state::AppState;
use registrar_models::{CourseCode, SectionId, TimeslotId, UserId, UserRole};

pub const TERM: &str = "2025-FALL";
pub const PAST_TERM: &str = "2025-SPRING";

/// A small catalog: CS101 and MATH101 meet Monday 09:00, CS201 (requires
/// CS101) meets Tuesday 09:00, plus a past-term CS101 section used to record
/// grades.
#[allow(dead_code)]
pub struct Campus {
    pub store: MemoryStore,
    pub service: EnrollmentService,
    pub monday: TimeslotId,
    pub tuesday: TimeslotId,
    pub cs101: SectionId,
    pub cs201: SectionId,
    pub math101: SectionId,
    pub past_cs101: SectionId,
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn campus() -> Campus {
    campus_with(EnrollmentPolicy::default(), 30)
}

pub fn campus_with(policy: EnrollmentPolicy, capacity: i32) -> Campus {
    let store = MemoryStore::new();
    let monday = store.add_timeslot("Mon", hour(9), hour(10));
    let tuesday = store.add_timeslot("Tue", hour(9), hour(10));
    let room = store.add_room("Science Hall 101");

    let cs101_course = store.add_course("CS101", "Intro to Programming");
    let cs201_course = store.add_course("CS201", "Data Structures");
    let math101_course = store.add_course("MATH101", "Calculus I");
    store.add_prerequisite("CS201", "CS101");

    let cs101 = store.add_section(&cs101_course, TERM, capacity, monday, room);
    let cs201 = store.add_section(&cs201_course, TERM, capacity, tuesday, room);
    let math101 = store.add_section(&math101_course, TERM, capacity, monday, room);
    let past_cs101 = store.add_section(&cs101_course, PAST_TERM, 100, monday, room);

    let service = EnrollmentService::new(Arc::new(store.clone()), policy);

    Campus {
        store,
        service,
        monday,
        tuesday,
        cs101,
        cs201,
        math101,
        past_cs101,
    }
}

#[allow(dead_code)]
impl Campus {
    /// Adds a one-off section of `course` in the current term.
    pub fn add_section(&self, course: &str, capacity: i32, slot: TimeslotId) -> SectionId {
        let code = CourseCode::new(course);
        let room = self.store.add_room(&format!("Room {}", course));
        self.store.add_section(&code, TERM, capacity, slot, room)
    }

    /// Enrolls `student` in the past CS101 section and grades it.
    pub async fn complete_cs101(&self, student: UserId, grade: &str) {
        self.service.enroll(student, self.past_cs101).await.unwrap();
        self.store
            .record_grade(student, self.past_cs101, grade)
            .unwrap();
    }

    /// Asserts every section counter matches its enrolled rows and no lock
    /// outlived its transaction.
    pub fn assert_consistent(&self) {
        for section in [self.cs101, self.cs201, self.math101, self.past_cs101] {
            let row = self.store.section(section).unwrap();
            assert_eq!(
                row.enrolled,
                self.store.count_enrolled(section),
                "counter drifted for section {}",
                section
            );
            assert!(row.enrolled >= 0 && row.enrolled <= row.capacity);
        }
        assert_eq!(self.store.held_locks(), 0);
    }
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "registrar-test-secret".to_string(),
        access_token_expiry: 3600,
    }
}

#[allow(dead_code)]
pub fn setup_test_app(campus: &Campus) -> axum::Router {
    let state = AppState {
        enrollments: campus.service.clone(),
        jwt_config: test_jwt_config(),
        cors_config: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    };
    init_router(state)
}

#[allow(dead_code)]
pub fn token_for(user: UserId, role: UserRole) -> String {
    create_access_token(user, role, &test_jwt_config()).unwrap()
}

#[allow(dead_code)]
pub fn authed(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
