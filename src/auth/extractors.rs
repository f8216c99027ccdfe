//! Axum extractors enforcing authorization.
//!
//! These read the [`AuthContext`] the authentication middleware installed
//! and reject when it is absent or insufficient. This is where anonymous
//! requests are actually denied.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthzError;
use super::types::AuthContext;
use crate::db::Role;

/// Extractor for endpoints that require any authenticated user.
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthzError::NotAuthenticated)
    }
}

/// Extractor for endpoints restricted to administrators.
pub struct AdminOnly(pub AuthContext);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(context) = CurrentUser::from_request_parts(parts, state).await?;

        if !context.has_role(Role::Admin) {
            return Err(AuthzError::InsufficientRole);
        }

        Ok(AdminOnly(context))
    }
}
