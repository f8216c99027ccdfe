//! Fail-open request authentication.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::bearer::bearer_token;
use super::types::AuthContext;
use crate::jwt::TokenCodec;

/// Shared state for the authentication layer.
#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
}

/// Routes served without authentication. Everything else gets one
/// authentication pass per request, before route handling.
fn is_open_route(path: &str, method: &Method) -> bool {
    path.starts_with("/api/auth/register")
        || path.starts_with("/api/auth/login")
        || path.starts_with("/api/auth/forgot-password")
        || (path.starts_with("/api/auth/reset-password") && method == Method::POST)
}

/// Reconstruct an authenticated identity from an inbound bearer token.
///
/// Never rejects: a missing, malformed, or expired token leaves the
/// request anonymous and the authorization extractors deny it downstream.
/// Claims are only trusted after `validate` confirms signature, expiry,
/// and subject match.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_open_route(request.uri().path(), request.method()) {
        return next.run(request).await;
    }

    if request.extensions().get::<AuthContext>().is_some() {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        return next.run(request).await;
    };

    let subject = match state.codec.extract_subject(token) {
        Ok(subject) => subject,
        Err(e) => {
            // Anonymous, not an error: authorization denies downstream.
            debug!(error = %e, "Ignoring unusable bearer token");
            return next.run(request).await;
        }
    };

    let roles = state.codec.extract_roles(token).unwrap_or_default();

    if state.codec.validate(token, &subject) {
        request
            .extensions_mut()
            .insert(AuthContext { subject, roles });
    }

    next.run(request).await
}
