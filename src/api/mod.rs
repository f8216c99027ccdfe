mod auth;
mod error;
mod users;

use std::sync::Arc;

use axum::Router;

use crate::rate_limit::RateLimitConfig;
use crate::service::AuthService;

pub use auth::AuthApiState;
pub use users::UsersApiState;

/// Create the API router.
pub fn create_api_router(service: AuthService) -> Router {
    let rate_limits = Arc::new(RateLimitConfig::new());

    let auth_state = AuthApiState {
        service: service.clone(),
    };
    let users_state = UsersApiState { service };

    Router::new()
        .nest("/auth", auth::router(auth_state, rate_limits))
        .nest("/users", users::router(users_state))
}
