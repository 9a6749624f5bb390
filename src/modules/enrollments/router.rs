use crate::modules::enrollments::controller::{
    drop_enrollment, enroll, get_course_eligibility, get_schedule, get_section_availability,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(enroll).get(get_schedule))
        .route("/{section_id}", delete(drop_enrollment))
}

pub fn init_sections_router() -> Router<AppState> {
    Router::new().route("/{id}/availability", get(get_section_availability))
}

pub fn init_courses_router() -> Router<AppState> {
    Router::new().route("/{code}/eligibility", get(get_course_eligibility))
}
