//! Response DTOs for the Web API.
//!
//! These derive Deserialize as well so the bundled client can parse them.

use serde::{Deserialize, Serialize};

use crate::auth::UserIdentity;
use crate::db::User;

/// User payload embedded in auth responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    /// User ID.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role ("parent" or "kid").
    pub role: String,
}

impl From<&User> for UserPayload {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
        }
    }
}

impl From<&UserIdentity> for UserPayload {
    fn from(user: &UserIdentity) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// PIN login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PinLoginResponse {
    /// Always true on the success path.
    pub success: bool,
    /// One-time token for session redemption.
    pub token: String,
    /// The user the token was minted for.
    pub user: UserPayload,
}

/// Session response (login, token redemption, refresh).
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    /// User information.
    pub user: UserPayload,
}

/// Simple success response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    /// Always true.
    pub success: bool,
}

impl OkResponse {
    /// Create a success response.
    pub fn new() -> Self {
        Self { success: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}
