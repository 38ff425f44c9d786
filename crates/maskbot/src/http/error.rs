//! API error type with IntoResponse
//!
//! Every error leaves the API as `{"error": "<message>"}` with a status code
//! derived from the structured database error code, never from message text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use maskcore::error::{classify, DbErrorKind};
use maskcore::AppError;

/// Shown when a query hits a column or table the database does not have
pub const SCHEMA_HINT: &str = "database schema is out of date; run the migrations (maskbot run applies them on start)";

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input (400)
    Validation(String),

    /// Missing/invalid admin credentials (401)
    Unauthorized(String),

    /// Resource not found (404)
    NotFound(String),

    /// Unique constraint violated (409)
    Conflict,

    /// Database unreachable after retries, or bot not configured (503)
    Unavailable(String),

    /// Database schema does not match the code (500, with hint)
    SchemaMismatch(String),

    /// Anything else (500, raw message)
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found", resource))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SchemaMismatch(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(m) | Self::Unauthorized(m) | Self::NotFound(m) | Self::Unavailable(m) | Self::Internal(m) => {
                m.clone()
            }
            Self::Conflict => "unique constraint conflict".to_string(),
            Self::SchemaMismatch(_) => SCHEMA_HINT.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::SchemaMismatch(detail) => tracing::error!("Database schema mismatch: {}", detail),
            Self::Internal(detail) => tracing::error!("Internal error: {}", detail),
            Self::Unavailable(detail) => tracing::warn!("Service unavailable: {}", detail),
            _ => {}
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match classify(&e) {
            DbErrorKind::Transient => Self::Unavailable("database unavailable, retry later".to_string()),
            DbErrorKind::UniqueViolation => Self::Conflict,
            DbErrorKind::ForeignKeyViolation => Self::NotFound("referenced entity not found".to_string()),
            DbErrorKind::SchemaMismatch => Self::SchemaMismatch(e.to_string()),
            DbErrorKind::NotFound => Self::NotFound("not found".to_string()),
            DbErrorKind::Other => Self::Internal(e.to_string()),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Database(db) => Self::from(db),
            AppError::NotFound(resource) => Self::not_found(resource),
            AppError::Validation(message) => Self::Validation(message),
            AppError::Unauthorized(message) => Self::Unauthorized(message),
            AppError::Unavailable(message) => Self::Unavailable(message),
            other => Self::Internal(other.to_string()),
        }
    }
}
