//! Authenticated request context.

use crate::db::Role;

/// Identity established for one request from a validated access token.
/// Request-scoped; never shared across requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Subject (username) from the token
    pub subject: String,
    /// Roles snapshotted at token issuance
    pub roles: Vec<Role>,
}

impl AuthContext {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
