//! Refresh token repository for JWT session renewal.

use super::DbPool;
use crate::Result;

#[cfg(feature = "sqlite")]
const SQL_NOW: &str = "datetime('now')";
#[cfg(feature = "postgres")]
const SQL_NOW: &str = "TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI:SS')";

/// Refresh token entity.
///
/// The ID is the token value itself, a UUID generated at creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token value (UUID string).
    pub id: String,
    /// User ID the token belongs to.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<String>,
}

/// New refresh token for creation.
pub struct NewRefreshToken {
    /// User ID the token belongs to.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: String,
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token. The token value is generated here.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&id)
        .bind(&new_token.user_id)
        .bind(&new_token.expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| crate::ChorelyError::NotFound("Refresh token".into()))
    }

    /// Get a refresh token by its value.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(token)
    }

    /// Get a valid (not expired, not revoked) refresh token.
    pub async fn get_valid(&self, id: &str) -> Result<Option<RefreshToken>> {
        let sql = format!(
            "SELECT id, user_id, expires_at, created_at, revoked_at
             FROM refresh_tokens
             WHERE id = $1
               AND revoked_at IS NULL
               AND expires_at > {}",
            SQL_NOW
        );
        let result = sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Revoke a refresh token.
    pub async fn revoke(&self, id: &str) -> Result<bool> {
        let sql = format!(
            "UPDATE refresh_tokens SET revoked_at = {} WHERE id = $1 AND revoked_at IS NULL",
            SQL_NOW
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired and revoked tokens (cleanup).
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let sql = format!(
            "DELETE FROM refresh_tokens WHERE expires_at < {} OR revoked_at IS NOT NULL",
            SQL_NOW
        );
        let result = sqlx::query(&sql)
            .execute(self.pool)
            .await
            .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
