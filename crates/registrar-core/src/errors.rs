//! Application error type with HTTP response conversion.
//!
//! Every handler in the API returns `Result<_, AppError>`. An [`AppError`]
//! carries the HTTP status, the underlying [`anyhow::Error`], a stable
//! machine-readable `code`, a `retryable` hint for clients and optional extra
//! fields that are merged into the JSON body.
//!
//! # Response Body
//!
//! ```json
//! {
//!   "error": "Missing prerequisites: CS101",
//!   "code": "ineligible",
//!   "retryable": false,
//!   "missing": ["CS101"]
//! }
//! ```

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub code: &'static str,
    pub retryable: bool,
    pub details: Map<String, Value>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable reason
    pub error: String,
    /// Stable error kind (e.g. `full`, `ineligible`, `conflict`)
    pub code: String,
    /// Whether the client should resubmit the same request
    pub retryable: bool,
    /// Missing prerequisite course codes, present only for `ineligible`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, code: &'static str, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            code,
            retryable: false,
            details: Map::new(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, "not_found", err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, "conflict", err)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "access_denied",
            anyhow::anyhow!(message.into()),
        )
    }

    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", err)
    }

    /// Overrides the error code while keeping the status.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Adds an extra top-level field to the JSON body.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.error.to_string()));
        body.insert("code".to_string(), Value::String(self.code.to_string()));
        body.insert("retryable".to_string(), Value::Bool(self.retryable));
        body.extend(self.details);

        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.error)
    }
}
