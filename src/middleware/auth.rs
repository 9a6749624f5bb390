use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use registrar_auth::{Claims, verify_token};
use registrar_core::AppError;
use registrar_models::{UserId, UserRole};

use crate::state::AppState;

/// Extractor that validates the bearer token and provides the caller's claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0.user_id()
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Capability gate for student-only endpoints.
///
/// Resolves to the caller's [`UserId`] when the token is valid and carries the
/// `student` role; anything else is rejected with 401 before the handler runs.
/// Handlers behind this extractor do not repeat the role check.
#[derive(Debug, Clone, Copy)]
pub struct RequireStudent(pub UserId);

impl FromRequestParts<AppState> for RequireStudent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if auth_user.role() != UserRole::Student {
            return Err(AppError::unauthorized("Unauthorized"));
        }

        Ok(RequireStudent(auth_user.user_id()?))
    }
}
