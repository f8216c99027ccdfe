//! Request authentication and authorization.
//!
//! Two stages, deliberately separate: a fail-open per-request middleware
//! that turns a valid bearer token into an [`AuthContext`] extension (a
//! malformed or missing token just leaves the request anonymous), and
//! fail-closed extractors that protected handlers use to require an
//! authenticated identity or a role. A bad token never produces an error
//! by itself; role enforcement happens uniformly at the extractors.

mod bearer;
mod errors;
mod extractors;
mod middleware;
mod types;

pub use bearer::bearer_token;
pub use errors::AuthzError;
pub use extractors::{AdminOnly, CurrentUser};
pub use middleware::{authenticate, AuthState};
pub use types::AuthContext;
