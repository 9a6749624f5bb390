use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use registrar_core::{AppError, ErrorResponse};
use registrar_models::{
    CourseCode, DropResponse, EnrollRequest, EnrollResponse, ScheduleEntry, SectionAvailability,
    SectionId,
};
use tracing::instrument;
use validator::Validate;

use crate::middleware::auth::{AuthUser, RequireStudent};
use crate::modules::enrollments::model::EligibilityResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrolled successfully", body = EnrollResponse),
        (status = 400, description = "Ineligible, section full or schedule conflict", body = ErrorResponse),
        (status = 401, description = "Not a student, suspended or unauthenticated", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled, or a retryable transaction conflict", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state))]
pub async fn enroll(
    State(state): State<AppState>,
    RequireStudent(student_id): RequireStudent,
    Json(dto): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<EnrollResponse>), AppError> {
    dto.validate()
        .map_err(|e| AppError::unprocessable(anyhow::anyhow!("Validation failed: {}", e)))?;

    let receipt = state
        .enrollments
        .enroll(student_id, SectionId::new(dto.section_id))
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{section_id}",
    params(
        ("section_id" = i64, Path, description = "Section to drop")
    ),
    responses(
        (status = 200, description = "Enrollment dropped", body = DropResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Section or enrollment not found", body = ErrorResponse),
        (status = 409, description = "Retryable transaction conflict", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state))]
pub async fn drop_enrollment(
    State(state): State<AppState>,
    RequireStudent(student_id): RequireStudent,
    Path(section_id): Path<SectionId>,
) -> Result<Json<DropResponse>, AppError> {
    let receipt = state
        .enrollments
        .drop_enrollment(student_id, section_id)
        .await?;
    Ok(Json(receipt.into()))
}

#[utoipa::path(
    get,
    path = "/api/enrollments",
    responses(
        (status = 200, description = "Current schedule", body = Vec<ScheduleEntry>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state))]
pub async fn get_schedule(
    State(state): State<AppState>,
    RequireStudent(student_id): RequireStudent,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let schedule = state.enrollments.student_schedule(student_id).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/sections/{id}/availability",
    params(
        ("id" = i64, Path, description = "Section ID")
    ),
    responses(
        (status = 200, description = "Seats taken and remaining", body = SectionAvailability),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Sections"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_section_availability(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<SectionId>,
) -> Result<Json<SectionAvailability>, AppError> {
    let availability = state.enrollments.section_availability(id).await?;
    Ok(Json(availability))
}

#[utoipa::path(
    get,
    path = "/api/courses/{code}/eligibility",
    params(
        ("code" = String, Path, description = "Course code, e.g. CS201")
    ),
    responses(
        (status = 200, description = "Prerequisite check result", body = EligibilityResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state))]
pub async fn get_course_eligibility(
    State(state): State<AppState>,
    RequireStudent(student_id): RequireStudent,
    Path(code): Path<String>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let report = state
        .enrollments
        .check_eligibility(student_id, &CourseCode::new(code))
        .await?;
    Ok(Json(report.into()))
}
