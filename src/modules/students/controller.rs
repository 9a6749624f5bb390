use axum::{Json, extract::State};
use registrar_core::{AppError, ErrorResponse};
use registrar_models::StudentStatusResponse;
use tracing::instrument;

use crate::middleware::auth::RequireStudent;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/students/me/status",
    responses(
        (status = 200, description = "Suspension status of the caller", body = StudentStatusResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_my_status(
    State(state): State<AppState>,
    RequireStudent(student_id): RequireStudent,
) -> Result<Json<StudentStatusResponse>, AppError> {
    let status = state.enrollments.student_status(student_id).await?;
    Ok(Json(status))
}
