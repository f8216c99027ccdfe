//! Authorization error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Rejection from the fail-closed authorization extractors.
#[derive(Debug)]
pub enum AuthzError {
    NotAuthenticated,
    InsufficientRole,
}

impl AuthzError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthzError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AuthzError::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthzError::NotAuthenticated => "Not authenticated",
            AuthzError::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
