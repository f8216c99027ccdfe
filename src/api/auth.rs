//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account, returns a token pair
//! - POST `/login` - Verify credentials, returns a token pair
//! - POST `/refresh-token` - Exchange a refresh token for a new access token
//! - POST `/logout?username=` - Revoke the refresh token (authenticated)
//! - POST `/forgot-password` - Create a reset token and email the link
//! - POST `/reset-password` - Consume a reset token, store a new password

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::CurrentUser;
use crate::rate_limit::{
    rate_limit_login, rate_limit_password_reset, rate_limit_register, RateLimitConfig,
};
use crate::service::AuthService;

#[derive(Clone)]
pub struct AuthApiState {
    pub service: AuthService,
}

pub fn router(state: AuthApiState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let register_routes = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_register,
        ));

    let login_routes = Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_login,
        ));

    let reset_routes = Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits,
            rate_limit_password_reset,
        ));

    let session_routes = Router::new()
        .route("/logout", post(logout))
        .with_state(state);

    register_routes
        .merge(login_routes)
        .merge(reset_routes)
        .merge(session_routes)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    /// Username or email
    identifier: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    token: String,
    new_password: String,
}

#[derive(Deserialize)]
struct LogoutParams {
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    access_token: String,
    refresh_token: String,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > 254 || !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

async fn register(
    State(state): State<AuthApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    validate_username(username)?;
    validate_email(email)?;
    validate_password(&payload.password)?;

    let tokens = state
        .service
        .register(username, email, &payload.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

async fn login(
    State(state): State<AuthApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .service
        .login(payload.identifier.trim(), &payload.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

async fn refresh_token(
    State(state): State<AuthApiState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.service.refresh(payload.refresh_token.trim()).await?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

async fn logout(
    State(state): State<AuthApiState>,
    CurrentUser(_context): CurrentUser,
    Query(params): Query<LogoutParams>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.logout(&params.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn forgot_password(
    State(state): State<AuthApiState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.forgot_password(payload.email.trim()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_password(
    State(state): State<AuthApiState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_password(&payload.new_password)?;

    state
        .service
        .reset_password(payload.token.trim(), &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
