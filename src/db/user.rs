//! User entity and repository.
//!
//! Users are either parents or kids. Parents sign in with a password;
//! kids sign in with a 4-digit PIN.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DbPool;
use crate::Result;

/// User role within a household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Parent account (full access, password login).
    Parent,
    /// Kid account (restricted access, PIN login).
    #[default]
    Kid,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Kid => "kid",
        }
    }

    /// Check if this is a parent role.
    pub fn is_parent(&self) -> bool {
        matches!(self, Role::Parent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parent" => Ok(Role::Parent),
            "kid" => Ok(Role::Kid),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// User entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID string).
    pub id: String,
    /// Email address (unique).
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role string as stored ("parent" or "kid").
    pub role: String,
    /// Password hash (Argon2), set for parents.
    pub password_hash: Option<String>,
    /// PIN hash (Argon2), set for kids.
    pub pin_hash: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl User {
    /// Get the role as enum. Unknown values fall back to Kid.
    pub fn role(&self) -> Role {
        Role::from_str(&self.role).unwrap_or(Role::Kid)
    }

    /// Check if this user is a parent.
    pub fn is_parent(&self) -> bool {
        self.role() == Role::Parent
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// User role (defaults to Kid).
    pub role: Role,
    /// Password hash (pre-hashed with Argon2).
    pub password_hash: Option<String>,
    /// PIN hash (pre-hashed with Argon2).
    pub pin_hash: Option<String>,
}

impl NewUser {
    /// Create a new user with minimal required fields.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role: Role::Kid,
            password_hash: None,
            pin_hash: None,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the password hash.
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Set the PIN hash.
    pub fn with_pin_hash(mut self, hash: impl Into<String>) -> Self {
        self.pin_hash = Some(hash.into());
        self
    }
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user. The ID is generated here.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO users (id, email, name, role, password_hash, pin_hash)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&id)
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .bind(&new_user.password_hash)
        .bind(&new_user.pin_hash)
        .execute(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| crate::ChorelyError::NotFound("User".into()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, role, password_hash, pin_hash, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, role, password_hash, pin_hash, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;

        Ok(user)
    }
}
