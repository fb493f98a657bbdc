//! Provider trait implementations over the HTTP client.

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::auth::{
    AuthChange, IdentityProvider, PinExchanger, PinGrant, Profile, ProfileError, ProfileResolver,
    ProviderError, Session, UserIdentity,
};
use crate::web::dto::{SessionResponse, UserPayload};
use crate::Role;

use super::api::AuthApi;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

fn session_from_response(response: SessionResponse) -> Session {
    Session {
        user_id: response.user.id,
        email: response.user.email,
        metadata_name: Some(response.user.name),
        access_token: response.access_token,
        refresh_token: response.refresh_token,
    }
}

fn identity_from_payload(user: UserPayload) -> UserIdentity {
    let role = user.role.parse::<Role>().unwrap_or_default();
    UserIdentity {
        id: user.id,
        email: user.email,
        name: user.name,
        role,
    }
}

/// Identity provider backed by the Chorely REST API.
///
/// Holds the current session in memory and pushes changes over a
/// broadcast channel for the session controller.
pub struct HttpIdentityProvider {
    api: AuthApi,
    session: Mutex<Option<Session>>,
    persisted_refresh_token: Option<String>,
    changes: broadcast::Sender<AuthChange>,
}

impl HttpIdentityProvider {
    /// Create a provider over an API client.
    pub fn new(api: AuthApi) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            api,
            session: Mutex::new(None),
            persisted_refresh_token: None,
            changes,
        }
    }

    /// Restore the session from a refresh token kept by a previous run.
    ///
    /// The token is only validated during [`initialize`](Self::initialize).
    pub fn with_persisted_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.persisted_refresh_token = Some(token.into());
        self
    }

    /// Determine and publish the initial session snapshot.
    ///
    /// Call once after subscribers are attached. A persisted refresh token
    /// is exchanged for a fresh session; one the server no longer accepts
    /// leaves the provider signed out.
    pub async fn initialize(&self) {
        if let Some(token) = &self.persisted_refresh_token {
            match self.api.refresh(token).await {
                Ok(response) => {
                    let session = session_from_response(response);
                    *self.session.lock().await = Some(session.clone());
                    self.publish(AuthChange::InitialSession(Some(session)));
                    return;
                }
                Err(e) => {
                    debug!("persisted session not restored: {}", e);
                }
            }
        }
        let session = self.session.lock().await.clone();
        self.publish(AuthChange::InitialSession(session));
    }

    /// Renew tokens for the current session.
    pub async fn refresh_session(&self) -> Result<Session, ProviderError> {
        let current = self.session.lock().await.clone();
        let Some(current) = current else {
            return Err(ProviderError::Rejected {
                status: 401,
                message: "No active session".to_string(),
            });
        };

        let response = self.api.refresh(&current.refresh_token).await?;
        let session = session_from_response(response);
        *self.session.lock().await = Some(session.clone());
        self.publish(AuthChange::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn publish(&self, change: AuthChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }

    async fn store_signed_in(&self, response: SessionResponse) -> Session {
        let session = session_from_response(response);
        *self.session.lock().await = Some(session.clone());
        self.publish(AuthChange::SignedIn(session.clone()));
        session
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let response = self.api.login(email, password).await?;
        Ok(self.store_signed_in(response).await)
    }

    async fn redeem_token(&self, token: &str) -> Result<Session, ProviderError> {
        let response = self.api.redeem_token(token).await?;
        Ok(self.store_signed_in(response).await)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let session = self.session.lock().await.take();

        // Local state is gone whether or not the server hears about it
        self.publish(AuthChange::SignedOut);

        if let Some(session) = session {
            self.api.logout(&session.refresh_token).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PinExchanger for HttpIdentityProvider {
    async fn exchange_pin(&self, user_id: &str, pin: &str) -> Result<PinGrant, ProviderError> {
        let response = self.api.pin_login(user_id, pin).await?;
        Ok(PinGrant {
            token: response.token,
            user: identity_from_payload(response.user),
        })
    }
}

/// Profile lookup via GET /api/auth/me.
pub struct HttpProfileResolver {
    api: AuthApi,
}

impl HttpProfileResolver {
    /// Create a resolver over an API client.
    pub fn new(api: AuthApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProfileResolver for HttpProfileResolver {
    async fn resolve(&self, session: &Session) -> Result<Profile, ProfileError> {
        let user = self
            .api
            .me(&session.access_token)
            .await
            .map_err(|e| match e {
                ProviderError::Rejected { status: 404, .. } => ProfileError::NotFound,
                other => ProfileError::Lookup(other.to_string()),
            })?;

        Ok(Profile {
            name: user.name,
            role: user.role.parse::<Role>().ok(),
        })
    }
}
