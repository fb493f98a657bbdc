//! One-time token repository for the PIN exchange handoff.
//!
//! A successful PIN exchange mints a short-lived token bound to the kid's
//! email. The token value is a SHA-256 digest of fresh entropy; the client
//! redeems it exactly once for a session.

use super::DbPool;
use crate::Result;

#[cfg(feature = "sqlite")]
const SQL_NOW: &str = "datetime('now')";
#[cfg(feature = "postgres")]
const SQL_NOW: &str = "TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI:SS')";

/// Token purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Session establishment after a PIN exchange.
    Session,
}

impl TokenPurpose {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Session => "session",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "session" => Some(TokenPurpose::Session),
            _ => None,
        }
    }
}

/// One-time token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OneTimeToken {
    /// Token ID.
    pub id: i64,
    /// Email the token is bound to.
    pub email: String,
    /// SHA-256 hash of the token value.
    pub token_hash: String,
    /// Token purpose.
    pub purpose: String,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Used timestamp (None if not used).
    pub used_at: Option<String>,
}

impl OneTimeToken {
    /// Get the token purpose as enum.
    pub fn purpose(&self) -> Option<TokenPurpose> {
        TokenPurpose::from_str(&self.purpose)
    }

    /// Check if the token has been used.
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// New one-time token for creation.
pub struct NewOneTimeToken {
    /// Email the token is bound to.
    pub email: String,
    /// SHA-256 hash of the token value.
    pub token_hash: String,
    /// Token purpose.
    pub purpose: TokenPurpose,
    /// Expiration timestamp.
    pub expires_at: String,
}

/// Repository for one-time token operations.
pub struct OneTimeTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> OneTimeTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new one-time token.
    pub async fn create(&self, new_token: &NewOneTimeToken) -> Result<OneTimeToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO one_time_tokens (email, token_hash, purpose, expires_at)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&new_token.email)
        .bind(&new_token.token_hash)
        .bind(new_token.purpose.as_str())
        .bind(&new_token.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| crate::ChorelyError::NotFound("One-time token".into()))
    }

    /// Get a one-time token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<OneTimeToken>> {
        let token = sqlx::query_as::<_, OneTimeToken>(
            "SELECT id, email, token_hash, purpose, expires_at, created_at, used_at
             FROM one_time_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(token)
    }

    /// Look up a valid (not expired, not used) token by hash and mark it as
    /// used atomically.
    ///
    /// Returns the token if it was valid and successfully marked as used.
    /// The UPDATE ... RETURNING form guarantees a token redeems at most once
    /// even under concurrent requests.
    pub async fn consume(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<OneTimeToken>> {
        let sql = format!(
            "UPDATE one_time_tokens
             SET used_at = {}
             WHERE token_hash = $1
               AND purpose = $2
               AND used_at IS NULL
               AND expires_at > {}
             RETURNING id, email, token_hash, purpose, expires_at, created_at, used_at",
            SQL_NOW, SQL_NOW
        );

        sqlx::query_as::<_, OneTimeToken>(&sql)
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| crate::ChorelyError::Database(e.to_string()))
    }

    /// Delete unused tokens for an email.
    ///
    /// Minting a new token first revokes any outstanding ones, so each email
    /// has at most one live token.
    pub async fn delete_unused_for_email(&self, email: &str) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM one_time_tokens WHERE email = $1 AND used_at IS NULL",
        )
        .bind(email)
        .execute(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete expired and used tokens (cleanup).
    pub async fn cleanup(&self) -> Result<u64> {
        let sql = format!(
            "DELETE FROM one_time_tokens WHERE expires_at < {} OR used_at IS NOT NULL",
            SQL_NOW
        );
        let result = sqlx::query(&sql)
            .execute(self.pool)
            .await
            .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::Database;

    fn session_token(email: &str, hash: &str, expires_at: &str) -> NewOneTimeToken {
        NewOneTimeToken {
            email: email.to_string(),
            token_hash: hash.to_string(),
            purpose: TokenPurpose::Session,
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_token() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeTokenRepository::new(db.pool());

        let token = repo
            .create(&session_token(
                "kid1@example.com",
                "hash-abc",
                "2099-12-31 23:59:59",
            ))
            .await
            .unwrap();

        assert_eq!(token.email, "kid1@example.com");
        assert_eq!(token.token_hash, "hash-abc");
        assert_eq!(token.purpose, "session");
        assert_eq!(token.purpose(), Some(TokenPurpose::Session));
        assert!(!token.is_used());
    }

    #[tokio::test]
    async fn test_consume_only_once() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeTokenRepository::new(db.pool());

        repo.create(&session_token(
            "kid1@example.com",
            "hash-once",
            "2099-12-31 23:59:59",
        ))
        .await
        .unwrap();

        // First consume succeeds
        let consumed = repo
            .consume("hash-once", TokenPurpose::Session)
            .await
            .unwrap();
        assert!(consumed.is_some());
        let consumed = consumed.unwrap();
        assert_eq!(consumed.email, "kid1@example.com");
        assert!(consumed.used_at.is_some());

        // Second consume fails (already used)
        let second = repo
            .consume("hash-once", TokenPurpose::Session)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_consume_expired_token() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeTokenRepository::new(db.pool());

        repo.create(&session_token(
            "kid1@example.com",
            "hash-expired",
            "2000-01-01 00:00:00",
        ))
        .await
        .unwrap();

        let consumed = repo
            .consume("hash-expired", TokenPurpose::Session)
            .await
            .unwrap();
        assert!(consumed.is_none());
    }

    #[tokio::test]
    async fn test_consume_unknown_hash() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeTokenRepository::new(db.pool());

        let consumed = repo
            .consume("never-created", TokenPurpose::Session)
            .await
            .unwrap();
        assert!(consumed.is_none());
    }

    #[tokio::test]
    async fn test_delete_unused_for_email() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeTokenRepository::new(db.pool());

        repo.create(&session_token(
            "kid1@example.com",
            "hash-old",
            "2099-12-31 23:59:59",
        ))
        .await
        .unwrap();
        repo.create(&session_token(
            "kid2@example.com",
            "hash-other",
            "2099-12-31 23:59:59",
        ))
        .await
        .unwrap();

        let deleted = repo.delete_unused_for_email("kid1@example.com").await.unwrap();
        assert_eq!(deleted, 1);

        // kid1's token is gone, kid2's survives
        assert!(repo
            .consume("hash-old", TokenPurpose::Session)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .consume("hash-other", TokenPurpose::Session)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_cleanup() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeTokenRepository::new(db.pool());

        // Expired token
        repo.create(&session_token(
            "kid1@example.com",
            "hash-stale",
            "2000-01-01 00:00:00",
        ))
        .await
        .unwrap();

        // Used token
        repo.create(&session_token(
            "kid2@example.com",
            "hash-used",
            "2099-12-31 23:59:59",
        ))
        .await
        .unwrap();
        repo.consume("hash-used", TokenPurpose::Session)
            .await
            .unwrap();

        // Live token
        repo.create(&session_token(
            "kid3@example.com",
            "hash-live",
            "2099-12-31 23:59:59",
        ))
        .await
        .unwrap();

        let deleted = repo.cleanup().await.unwrap();
        assert_eq!(deleted, 2);

        let still_valid = repo
            .consume("hash-live", TokenPurpose::Session)
            .await
            .unwrap();
        assert!(still_valid.is_some());
    }

    #[test]
    fn test_token_purpose_conversion() {
        assert_eq!(TokenPurpose::Session.as_str(), "session");
        assert_eq!(
            TokenPurpose::from_str("session"),
            Some(TokenPurpose::Session)
        );
        assert_eq!(TokenPurpose::from_str("unknown"), None);
    }
}
