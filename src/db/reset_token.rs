//! Persisted password reset token records.
//!
//! Same shape as the refresh token store but short-lived and single-use:
//! the orchestrator deletes the record immediately after a successful
//! password reset, and expiry verification deletes it on a dead link.

use sqlx::sqlite::SqlitePool;

use super::{generate_token_string, VerifyError};

/// Reset tokens live for one hour.
pub const RESET_TOKEN_TTL_SECS: u64 = 60 * 60;

/// A persisted password reset token record.
#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
    /// Computed by the database at fetch time: expiry strictly in the past.
    pub expired: bool,
}

/// Store for password reset token records.
pub struct ResetTokenStore {
    pool: SqlitePool,
}

impl ResetTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new record for the user, replacing any existing one.
    pub async fn create(&self, user_id: i64) -> Result<ResetTokenRecord, sqlx::Error> {
        let token = generate_token_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, expires_at) VALUES (?, ?, datetime('now', ?))",
        )
        .bind(&token)
        .bind(user_id)
        .bind(format!("+{} seconds", RESET_TOKEN_TTL_SECS))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let record = self.find_by_token(&token).await?;
        record.ok_or(sqlx::Error::RowNotFound)
    }

    /// Look up a record by its token string.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<ResetTokenRecord>, sqlx::Error> {
        let row: Option<(i64, String, i64, String, i32)> = sqlx::query_as(
            "SELECT id, token, user_id, expires_at, expires_at < datetime('now')
             FROM password_reset_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, token, user_id, expires_at, expired)| ResetTokenRecord {
            id,
            token,
            user_id,
            expires_at,
            expired: expired != 0,
        }))
    }

    /// Fail with `Expired` if the record's expiry has passed, deleting the
    /// record as a side effect; the email link is dead and a new request
    /// is required.
    pub async fn verify_expiration(&self, record: &ResetTokenRecord) -> Result<(), VerifyError> {
        if !record.expired {
            return Ok(());
        }

        sqlx::query("DELETE FROM password_reset_tokens WHERE id = ?")
            .bind(record.id)
            .execute(&self.pool)
            .await
            .map_err(VerifyError::Database)?;
        Err(VerifyError::Expired)
    }

    /// Delete the user's record, if any. Idempotent.
    pub async fn delete_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all expired records.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < datetime('now')")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
