//! One-time token issuer backed by the one_time_tokens table.

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::TokenIssuer;
use crate::db::{Database, NewOneTimeToken, OneTimeTokenRepository, TokenPurpose};
use crate::Result;

/// Default token lifetime in minutes.
const DEFAULT_TTL_MINS: i64 = 10;

/// Mints one-time session tokens.
///
/// The token value is the SHA-256 digest of fresh entropy; the same value
/// is stored and returned, and redemption consumes it by that value.
/// Minting first revokes any unused token for the email, so each email has
/// at most one live token.
pub struct SqlTokenIssuer {
    db: Database,
    ttl_mins: i64,
}

impl SqlTokenIssuer {
    /// Create an issuer with the default lifetime.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            ttl_mins: DEFAULT_TTL_MINS,
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl_mins(mut self, ttl_mins: i64) -> Self {
        self.ttl_mins = ttl_mins;
        self
    }
}

fn mint_token() -> String {
    let entropy = uuid::Uuid::new_v4();
    let digest = Sha256::digest(entropy.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl TokenIssuer for SqlTokenIssuer {
    async fn issue_token(&self, email: &str) -> Result<String> {
        let repo = OneTimeTokenRepository::new(self.db.pool());

        let revoked = repo.delete_unused_for_email(email).await?;
        if revoked > 0 {
            debug!(email = %email, revoked, "revoked outstanding one-time tokens");
        }

        let token = mint_token();
        let expires_at = (Utc::now() + chrono::Duration::minutes(self.ttl_mins))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        repo.create(&NewOneTimeToken {
            email: email.to_string(),
            token_hash: token.clone(),
            purpose: TokenPurpose::Session,
            expires_at,
        })
        .await?;

        Ok(token)
    }
}
