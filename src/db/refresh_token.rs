//! Persisted refresh token records.
//!
//! A refresh token is an opaque random string backed by a database row.
//! At most one record is live per user; issuing a new one replaces the
//! previous record, and logout deletes it outright, so revocation is
//! server-side and immediate.

use sqlx::sqlite::SqlitePool;

use super::{generate_token_string, VerifyError};

/// A persisted refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
    /// Computed by the database at fetch time: expiry strictly in the past.
    pub expired: bool,
}

/// Store for refresh token records.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new record for the user, replacing any existing one.
    /// Delete and insert run in one transaction so exactly one record
    /// survives concurrent calls for the same user.
    pub async fn create(
        &self,
        user_id: i64,
        ttl_secs: u64,
    ) -> Result<RefreshTokenRecord, sqlx::Error> {
        let token = generate_token_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES (?, ?, datetime('now', ?))",
        )
        .bind(&token)
        .bind(user_id)
        .bind(format!("+{} seconds", ttl_secs))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let record = self.find_by_token(&token).await?;
        record.ok_or(sqlx::Error::RowNotFound)
    }

    /// Look up a record by its token string.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<(i64, String, i64, String, i32)> = sqlx::query_as(
            "SELECT id, token, user_id, expires_at, expires_at < datetime('now')
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, token, user_id, expires_at, expired)| RefreshTokenRecord {
            id,
            token,
            user_id,
            expires_at,
            expired: expired != 0,
        }))
    }

    /// Fail with `Expired` if the record's expiry has passed, deleting the
    /// record as a side effect. The caller must treat that as "must
    /// re-authenticate", not as a retryable error.
    pub async fn verify_expiration(&self, record: &RefreshTokenRecord) -> Result<(), VerifyError> {
        if !record.expired {
            return Ok(());
        }

        sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
            .bind(record.id)
            .execute(&self.pool)
            .await
            .map_err(VerifyError::Database)?;
        Err(VerifyError::Expired)
    }

    /// Delete the user's record, if any. Idempotent.
    pub async fn delete_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all expired records.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
