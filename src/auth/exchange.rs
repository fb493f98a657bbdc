//! PIN exchange: swap a kid's user ID and PIN for a one-time session token.
//!
//! The exchange validates input before touching any collaborator, checks the
//! PIN against the credential store, gates on the kid role, and mints a
//! token bound to the user's email. A failed verification and an unknown
//! user produce the same error so callers cannot probe for valid user IDs.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::pin::validate_pin;
use crate::db::Role;

/// Identity facts needed to authorize a PIN exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// User ID.
    pub id: String,
    /// Email address the session token will be bound to.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
}

/// Successful exchange result.
#[derive(Debug, Clone)]
pub struct PinGrant {
    /// One-time token, redeemable once for a session.
    pub token: String,
    /// The user the token was minted for.
    pub user: UserIdentity,
}

/// Errors returned by the PIN exchange.
///
/// Display strings are the exact messages the wire layer sends.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// User ID or PIN missing.
    #[error("User ID and PIN are required")]
    MissingCredentials,

    /// PIN is not four digits.
    #[error("PIN must be 4 digits")]
    MalformedPin,

    /// Unknown user or wrong PIN. One message for both.
    #[error("Invalid PIN or user ID")]
    InvalidCredentials,

    /// Valid credentials, but the user is not a kid.
    #[error("PIN login is only for kids")]
    KidsOnly,

    /// User lookup failed after verification.
    #[error("user lookup failed: {0}")]
    Lookup(String),

    /// Token minting failed.
    #[error("token issuance failed: {0}")]
    Issuance(String),
}

/// Credential store the exchange verifies PINs against.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Check a PIN for a user. `Ok(false)` when the user is unknown or the
    /// PIN does not match.
    async fn verify_pin(&self, user_id: &str, pin: &str) -> crate::Result<bool>;

    /// Fetch identity facts for a user.
    async fn lookup_user(&self, user_id: &str) -> crate::Result<Option<UserIdentity>>;
}

/// Mints one-time session tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a one-time token bound to the given email.
    async fn issue_token(&self, email: &str) -> crate::Result<String>;
}

/// The PIN exchange service.
pub struct PinExchange {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
}

impl PinExchange {
    /// Create an exchange over the given store and issuer.
    pub fn new(store: Arc<dyn CredentialStore>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self { store, issuer }
    }

    /// Exchange a user ID and PIN for a one-time token.
    ///
    /// Input checks run before any store call. Verification is attempted
    /// exactly once; a wrong PIN is not transient and is never retried.
    pub async fn exchange(&self, user_id: &str, pin: &str) -> Result<PinGrant, ExchangeError> {
        if user_id.is_empty() || pin.is_empty() {
            return Err(ExchangeError::MissingCredentials);
        }
        if validate_pin(pin).is_err() {
            return Err(ExchangeError::MalformedPin);
        }

        // A store error is reported like a failed match so responses do not
        // reveal which user IDs exist.
        let verified = match self.store.verify_pin(user_id, pin).await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "PIN verification errored");
                false
            }
        };
        if !verified {
            return Err(ExchangeError::InvalidCredentials);
        }

        let user = match self.store.lookup_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(ExchangeError::InvalidCredentials),
            Err(e) => return Err(ExchangeError::Lookup(e.to_string())),
        };

        if user.role != Role::Kid {
            warn!(user_id = %user.id, role = %user.role, "PIN login rejected for non-kid");
            return Err(ExchangeError::KidsOnly);
        }

        let token = self
            .issuer
            .issue_token(&user.email)
            .await
            .map_err(|e| ExchangeError::Issuance(e.to_string()))?;

        debug!(user_id = %user.id, "PIN exchange succeeded");
        Ok(PinGrant { token, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeStore {
        pin_matches: bool,
        verify_fails: bool,
        user: Option<UserIdentity>,
        verify_calls: AtomicUsize,
        lookup_calls: AtomicUsize,
    }

    impl FakeStore {
        fn new(pin_matches: bool, user: Option<UserIdentity>) -> Self {
            Self {
                pin_matches,
                verify_fails: false,
                user,
                verify_calls: AtomicUsize::new(0),
                lookup_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                pin_matches: false,
                verify_fails: true,
                user: None,
                verify_calls: AtomicUsize::new(0),
                lookup_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialStore for FakeStore {
        async fn verify_pin(&self, _user_id: &str, _pin: &str) -> crate::Result<bool> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if self.verify_fails {
                return Err(crate::ChorelyError::Database("store down".into()));
            }
            Ok(self.pin_matches)
        }

        async fn lookup_user(&self, _user_id: &str) -> crate::Result<Option<UserIdentity>> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.user.clone())
        }
    }

    struct FakeIssuer {
        issued_for: Mutex<Vec<String>>,
    }

    impl FakeIssuer {
        fn new() -> Self {
            Self {
                issued_for: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl TokenIssuer for FakeIssuer {
        async fn issue_token(&self, email: &str) -> crate::Result<String> {
            self.issued_for.lock().unwrap().push(email.to_string());
            Ok("minted-token".to_string())
        }
    }

    fn kid_alice() -> UserIdentity {
        UserIdentity {
            id: "u2".to_string(),
            email: "kid1@example.com".to_string(),
            name: "Alice Kid".to_string(),
            role: Role::Kid,
        }
    }

    fn exchange_over(store: FakeStore) -> (PinExchange, Arc<FakeStore>, Arc<FakeIssuer>) {
        let store = Arc::new(store);
        let issuer = Arc::new(FakeIssuer::new());
        let exchange = PinExchange::new(store.clone(), issuer.clone());
        (exchange, store, issuer)
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_store() {
        let (exchange, store, _) = exchange_over(FakeStore::new(true, Some(kid_alice())));

        for (user_id, pin) in [("", ""), ("u2", ""), ("", "1234")] {
            let err = exchange.exchange(user_id, pin).await.unwrap_err();
            assert!(matches!(err, ExchangeError::MissingCredentials));
            assert_eq!(err.to_string(), "User ID and PIN are required");
        }
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_pin_skips_store() {
        let (exchange, store, _) = exchange_over(FakeStore::new(true, Some(kid_alice())));

        for pin in ["123", "12345", "abcd", "12 4"] {
            let err = exchange.exchange("u2", pin).await.unwrap_err();
            assert!(matches!(err, ExchangeError::MalformedPin));
            assert_eq!(err.to_string(), "PIN must be 4 digits");
        }
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_pin_rejected() {
        let (exchange, store, _) = exchange_over(FakeStore::new(false, Some(kid_alice())));

        let err = exchange.exchange("u2", "1234").await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid PIN or user ID");
        // Verification is attempted exactly once, never retried
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 1);
        // No lookup after a failed match
        assert_eq!(store.lookup_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_error_indistinguishable_from_wrong_pin() {
        let (exchange, store, _) = exchange_over(FakeStore::failing());

        let err = exchange.exchange("u2", "1234").await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid PIN or user ID");
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verified_but_vanished_user_rejected() {
        let (exchange, _, _) = exchange_over(FakeStore::new(true, None));

        let err = exchange.exchange("u2", "1234").await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_parent_cannot_use_pin_login() {
        let parent = UserIdentity {
            id: "u1".to_string(),
            email: "parent@example.com".to_string(),
            name: "Pat Parent".to_string(),
            role: Role::Parent,
        };
        let (exchange, _, issuer) = exchange_over(FakeStore::new(true, Some(parent)));

        let err = exchange.exchange("u1", "1234").await.unwrap_err();
        assert!(matches!(err, ExchangeError::KidsOnly));
        assert_eq!(err.to_string(), "PIN login is only for kids");
        // No token minted for the rejected exchange
        assert!(issuer.issued_for.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_kid_exchange() {
        let (exchange, store, issuer) = exchange_over(FakeStore::new(true, Some(kid_alice())));

        let grant = exchange.exchange("u2", "1234").await.unwrap();
        assert_eq!(grant.token, "minted-token");
        assert_eq!(grant.user, kid_alice());
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 1);
        // Token is bound to the user's email, not the user ID
        assert_eq!(
            *issuer.issued_for.lock().unwrap(),
            vec!["kid1@example.com".to_string()]
        );
    }
}
