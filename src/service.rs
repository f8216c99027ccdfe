//! Account and session lifecycle orchestration.
//!
//! Each operation is an independent transaction against the user store and
//! the token stores; no state lives on the service itself beyond shared
//! handles. Issued access tokens stay valid until natural expiry even
//! after logout or a role change; the short access TTL bounds that window.

use std::sync::Arc;

use tracing::{error, info, warn};
use url::Url;

use crate::db::{Database, Role, User, VerifyError};
use crate::email::{password_reset_body, Mailer};
use crate::jwt::{TokenCodec, TokenError};
use crate::password::{hash_password, verify_password, HashError};

/// Token pair returned from register, login, and refresh.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    /// Signed access token, short-lived
    pub access_token: String,
    /// Opaque persisted refresh token
    pub refresh_token: String,
}

/// Coordinates credential verification, token issuance, rotation, logout,
/// and account mutation.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    codec: Arc<TokenCodec>,
    mailer: Arc<dyn Mailer>,
    public_origin: Url,
    refresh_ttl_secs: u64,
}

impl AuthService {
    pub fn new(
        db: Database,
        codec: Arc<TokenCodec>,
        mailer: Arc<dyn Mailer>,
        public_origin: Url,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            codec,
            mailer,
            public_origin,
            refresh_ttl_secs,
        }
    }

    /// Issue an access token from the user's current roles plus a fresh
    /// persisted refresh token.
    async fn issue_tokens(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let access_token = self.codec.issue_access(&user.username, &user.roles)?;
        let refresh = self
            .db
            .refresh_tokens()
            .create(user.id, self.refresh_ttl_secs)
            .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token: refresh.token,
        })
    }

    /// Create an account and issue its first token pair.
    /// Uniqueness of username and email is checked before any mutation.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, AuthError> {
        info!(username = %username, "Registering new user");

        if self.db.users().get_by_username(username).await?.is_some() {
            warn!(username = %username, "Username already exists");
            return Err(AuthError::Duplicate("Username already exists"));
        }
        if self.db.users().get_by_email(email).await?.is_some() {
            warn!(email = %email, "Email already exists");
            return Err(AuthError::Duplicate("Email already exists"));
        }

        let password_hash = hash_password(password)?;
        let id = self
            .db
            .users()
            .create(username, email, &password_hash, &[Role::User])
            .await?;

        let user = self
            .db
            .users()
            .get_by_id(id)
            .await?
            .ok_or(AuthError::NotFound("User not found"))?;

        info!(username = %user.username, "User registered");
        self.issue_tokens(&user).await
    }

    /// Authenticate by username or email plus password.
    /// Unknown identifier and wrong password are indistinguishable to the
    /// caller; neither leaks which part failed.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthTokens, AuthError> {
        info!(identifier = %identifier, "Login attempt");

        let user = match self.db.users().get_by_username(identifier).await? {
            Some(user) => Some(user),
            None => self.db.users().get_by_email(identifier).await?,
        };

        let Some(user) = user else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        info!(username = %user.username, "Login succeeded");
        self.issue_tokens(&user).await
    }

    /// Exchange a refresh token for a new access token. The refresh token
    /// itself is not rotated. Roles are re-read from the user store, so a
    /// role change takes effect at the next refresh.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let record = self
            .db
            .refresh_tokens()
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::NotFound("Refresh token not found"))?;

        match self.db.refresh_tokens().verify_expiration(&record).await {
            Ok(()) => {}
            Err(VerifyError::Expired) => return Err(AuthError::RefreshExpired),
            Err(VerifyError::Database(e)) => return Err(AuthError::Database(e)),
        }

        let user = self
            .db
            .users()
            .get_by_id(record.user_id)
            .await?
            .ok_or(AuthError::NotFound("User not found for refresh token"))?;

        let access_token = self.codec.issue_access(&user.username, &user.roles)?;

        info!(username = %user.username, "Access token refreshed");
        Ok(AuthTokens {
            access_token,
            refresh_token: record.token,
        })
    }

    /// Delete the user's refresh token record. Idempotent with respect to
    /// the record; already-issued access tokens expire naturally.
    pub async fn logout(&self, username: &str) -> Result<(), AuthError> {
        let user = self
            .db
            .users()
            .get_by_username(username)
            .await?
            .ok_or(AuthError::NotFound("User not found"))?;

        self.db.refresh_tokens().delete_by_user(user.id).await?;
        info!(username = %username, "User logged out");
        Ok(())
    }

    /// Create a reset token for the account behind `email` and dispatch
    /// the reset link. The send runs on its own task; transport failures
    /// are logged and do not fail the request or roll back the record.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let user = self
            .db
            .users()
            .get_by_email(email)
            .await?
            .ok_or(AuthError::NotFound("User with this email not found"))?;

        let record = self.db.reset_tokens().create(user.id).await?;

        let reset_link = format!(
            "{}/api/auth/reset-password?token={}",
            self.public_origin.as_str().trim_end_matches('/'),
            record.token
        );
        let body = password_reset_body(&reset_link);
        let to = user.email.clone();
        let mailer = self.mailer.clone();

        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, "Password reset", &body).await {
                error!(to = %to, error = %e, "Failed to send password reset email");
            }
        });

        info!(email = %email, "Password reset requested");
        Ok(())
    }

    /// Consume a reset token and store the new password. The record is
    /// deleted on success, so a token resets at most one password.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let record = self
            .db
            .reset_tokens()
            .find_by_token(token)
            .await?
            .ok_or(AuthError::NotFound("Invalid password reset token"))?;

        match self.db.reset_tokens().verify_expiration(&record).await {
            Ok(()) => {}
            Err(VerifyError::Expired) => return Err(AuthError::ResetExpired),
            Err(VerifyError::Database(e)) => return Err(AuthError::Database(e)),
        }

        let user = self
            .db
            .users()
            .get_by_id(record.user_id)
            .await?
            .ok_or(AuthError::NotFound("User not found"))?;

        let password_hash = hash_password(new_password)?;
        self.db.users().update_password(user.id, &password_hash).await?;
        self.db.reset_tokens().delete_by_user(user.id).await?;

        info!(username = %user.username, "Password reset");
        Ok(())
    }

    /// Delete an account, cascading its token records first.
    pub async fn delete_user(&self, id: i64) -> Result<(), AuthError> {
        self.db.refresh_tokens().delete_by_user(id).await?;
        self.db.reset_tokens().delete_by_user(id).await?;

        let user = self
            .db
            .users()
            .get_by_id(id)
            .await?
            .ok_or(AuthError::NotFound("User not found"))?;

        self.db.users().delete(user.id).await?;
        info!(username = %user.username, "User deleted");
        Ok(())
    }

    /// Replace the user's role set with a singleton of the new role.
    /// Outstanding access tokens keep their old role claims until expiry.
    pub async fn update_user_role(&self, id: i64, role: Role) -> Result<(), AuthError> {
        let updated = self.db.users().set_roles(id, &[role]).await?;
        if !updated {
            return Err(AuthError::NotFound("User not found"));
        }

        info!(user_id = id, role = %role.as_str(), "User role updated");
        Ok(())
    }
}

/// Domain failure taxonomy surfaced to the HTTP boundary.
#[derive(Debug)]
pub enum AuthError {
    /// Unique constraint on username or email
    Duplicate(&'static str),
    /// Identifier/password mismatch; deliberately not NotFound
    InvalidCredentials,
    /// No user or record matches a lookup
    NotFound(&'static str),
    /// Persisted refresh token past expiry (record deleted)
    RefreshExpired,
    /// Persisted reset token past expiry (record deleted)
    ResetExpired,
    Database(sqlx::Error),
    Token(TokenError),
    Hash(HashError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Duplicate(msg) => write!(f, "{}", msg),
            AuthError::InvalidCredentials => write!(f, "Username or password is incorrect"),
            AuthError::NotFound(msg) => write!(f, "{}", msg),
            AuthError::RefreshExpired => write!(f, "Refresh token expired. Please log in again"),
            AuthError::ResetExpired => write!(f, "Password reset token expired"),
            AuthError::Database(e) => write!(f, "Database error: {}", e),
            AuthError::Token(e) => write!(f, "Token error: {}", e),
            AuthError::Hash(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Database(e)
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        AuthError::Token(e)
    }
}

impl From<HashError> for AuthError {
    fn from(e: HashError) -> Self {
        AuthError::Hash(e)
    }
}
