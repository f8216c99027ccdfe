//! Shared error handling for API endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::service::AuthError;

/// API error type with automatic response conversion.
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Domain failures map onto the HTTP taxonomy here; internal failures are
/// logged in full and redacted from the caller-visible message.
impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Duplicate(msg) => ApiError::conflict(msg),
            AuthError::InvalidCredentials => {
                ApiError::unauthorized("Username or password is incorrect")
            }
            AuthError::NotFound(msg) => ApiError::not_found(msg),
            AuthError::RefreshExpired => {
                ApiError::unauthorized("Refresh token expired. Please log in again")
            }
            AuthError::ResetExpired => ApiError::not_found("Password reset token expired"),
            AuthError::Database(e) => {
                error!("Database error: {}", e);
                ApiError::internal("Database error")
            }
            AuthError::Token(e) => {
                error!("Token error: {}", e);
                ApiError::internal("Internal error")
            }
            AuthError::Hash(e) => {
                error!("{}", e);
                ApiError::internal("Internal error")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
