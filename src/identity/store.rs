//! Credential store backed by the users table.

use async_trait::async_trait;

use crate::auth::{verify_pin, CredentialStore, UserIdentity};
use crate::db::{Database, UserRepository};
use crate::{ChorelyError, Result};

/// Verifies PINs and looks up identity facts in the database.
pub struct SqlCredentialStore {
    db: Database,
}

impl SqlCredentialStore {
    /// Create a store over the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    async fn verify_pin(&self, user_id: &str, pin: &str) -> Result<bool> {
        let repo = UserRepository::new(self.db.pool());

        let Some(user) = repo.get_by_id(user_id).await? else {
            return Ok(false);
        };
        let Some(hash) = user.pin_hash.as_deref() else {
            return Ok(false);
        };

        verify_pin(pin, hash).map_err(|e| ChorelyError::Auth(e.to_string()))
    }

    async fn lookup_user(&self, user_id: &str) -> Result<Option<UserIdentity>> {
        let repo = UserRepository::new(self.db.pool());

        Ok(repo.get_by_id(user_id).await?.map(|user| UserIdentity {
            role: user.role(),
            id: user.id,
            email: user.email,
            name: user.name,
        }))
    }
}
