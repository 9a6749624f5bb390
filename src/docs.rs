use registrar_core::ErrorResponse;
use registrar_models::{
    CourseCode, DropResponse, EnrollRequest, EnrollResponse, ScheduleEntry, SectionAvailability,
    StudentStatusResponse,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::enrollments::model::EligibilityResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::enrollments::controller::enroll,
        crate::modules::enrollments::controller::drop_enrollment,
        crate::modules::enrollments::controller::get_schedule,
        crate::modules::enrollments::controller::get_section_availability,
        crate::modules::enrollments::controller::get_course_eligibility,
        crate::modules::students::controller::get_my_status,
    ),
    components(
        schemas(
            CourseCode,
            EnrollRequest,
            EnrollResponse,
            DropResponse,
            ScheduleEntry,
            SectionAvailability,
            EligibilityResponse,
            StudentStatusResponse,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Enrollments", description = "Enroll in, drop and list course sections"),
        (name = "Sections", description = "Section capacity"),
        (name = "Students", description = "Student account status")
    ),
    info(
        title = "Registrar API",
        version = "0.1.0",
        description = "Course enrollment with transactional seat accounting, built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
