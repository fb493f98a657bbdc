//! Identity provider abstraction for the client session layer.
//!
//! The provider owns raw sessions (tokens plus base identity) and pushes
//! state changes over a broadcast channel. The session controller
//! subscribes rather than polling.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use super::exchange::PinGrant;

/// A raw authenticated session as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// User ID.
    pub user_id: String,
    /// Email address.
    pub email: String,
    /// Display name from sign-up metadata, when the provider has one.
    pub metadata_name: Option<String>,
    /// Access token (JWT).
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
}

/// Authentication state changes emitted by a provider.
#[derive(Debug, Clone)]
pub enum AuthChange {
    /// First snapshot after the provider loads persisted state. Emitted
    /// exactly once, with the restored session if there was one.
    InitialSession(Option<Session>),
    /// A sign-in completed.
    SignedIn(Session),
    /// The session ended.
    SignedOut,
    /// Tokens were renewed for the current session.
    TokenRefreshed(Session),
}

/// Errors from provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected the request. The message is surfaced to the
    /// caller verbatim.
    #[error("{message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-supplied error message.
        message: String,
    },

    /// The provider could not be reached.
    #[error("auth service unreachable: {0}")]
    Transport(String),
}

/// A session/token-issuing identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to auth state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// The current session, if any.
    async fn current_session(&self) -> Option<Session>;

    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// Redeem a one-time token for a session.
    async fn redeem_token(&self, token: &str) -> Result<Session, ProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// The server-side PIN exchange as seen from the client.
#[async_trait]
pub trait PinExchanger: Send + Sync {
    /// Exchange a user ID and PIN for a one-time token.
    async fn exchange_pin(&self, user_id: &str, pin: &str) -> Result<PinGrant, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_displays_message_verbatim() {
        let err = ProviderError::Rejected {
            status: 403,
            message: "PIN login is only for kids".to_string(),
        };
        assert_eq!(err.to_string(), "PIN login is only for kids");
    }

    #[test]
    fn test_transport_display() {
        let err = ProviderError::Transport("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "auth service unreachable: connection refused"
        );
    }
}
