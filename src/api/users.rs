//! User administration endpoints.
//!
//! - DELETE `/{id}` - Delete an account and its token records (admin)
//! - PUT `/{id}/role` - Replace the account's role set (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, put},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiError;
use crate::auth::AdminOnly;
use crate::db::Role;
use crate::service::AuthService;

#[derive(Clone)]
pub struct UsersApiState {
    pub service: AuthService,
}

pub fn router(state: UsersApiState) -> Router {
    Router::new()
        .route("/{id}", delete(delete_user))
        .route("/{id}/role", put(update_role))
        .with_state(state)
}

async fn delete_user(
    State(state): State<UsersApiState>,
    AdminOnly(_admin): AdminOnly,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_user(id).await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}

#[derive(Deserialize)]
struct UpdateRoleRequest {
    role: String,
}

async fn update_role(
    State(state): State<UsersApiState>,
    AdminOnly(_admin): AdminOnly,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = Role::parse(payload.role.trim())
        .ok_or_else(|| ApiError::bad_request("Unknown role"))?;

    state.service.update_user_role(id, role).await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}
