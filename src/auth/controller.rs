//! Client-side session controller.
//!
//! Owns the published auth state for a running client. The controller
//! subscribes to identity provider changes rather than querying eagerly,
//! resolves raw sessions into application users via the profile lookup,
//! and exposes sign-in, PIN sign-in, sign-out, and manual refresh.
//!
//! The published state is a single watch slot with one writer. In-flight
//! resolutions are never cancelled when superseded; whichever finishes
//! last overwrites the slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::profile::{degraded_profile, resolve_with_policy, ProfileResolver, ResolvePolicy};
use super::provider::{AuthChange, IdentityProvider, PinExchanger, ProviderError, Session};
use crate::db::Role;

/// How long to wait for the provider's initial snapshot before giving up
/// on the loading state.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A resolved application user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role. `None` when profile resolution degraded.
    pub role: Option<Role>,
}

impl AuthenticatedUser {
    /// Check for parent privileges. An unresolved role is least privilege,
    /// never parent.
    pub fn is_parent(&self) -> bool {
        self.role == Some(Role::Parent)
    }
}

/// Published authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Controller constructed but not started.
    #[default]
    Uninitialized,
    /// Waiting for the provider's initial snapshot.
    Initializing,
    /// A signed-in user with a resolved (possibly degraded) profile.
    Authenticated(AuthenticatedUser),
    /// No session.
    Unauthenticated,
}

impl AuthState {
    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// The session controller.
pub struct SessionController {
    provider: Arc<dyn IdentityProvider>,
    exchanger: Arc<dyn PinExchanger>,
    resolver: Arc<dyn ProfileResolver>,
    policy: ResolvePolicy,
    startup_timeout: Duration,
    state_tx: Arc<watch::Sender<AuthState>>,
}

impl SessionController {
    /// Create a controller. State stays `Uninitialized` until [`start`] is
    /// called.
    ///
    /// [`start`]: SessionController::start
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        exchanger: Arc<dyn PinExchanger>,
        resolver: Arc<dyn ProfileResolver>,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Uninitialized);
        Self {
            provider,
            exchanger,
            resolver,
            policy: ResolvePolicy::default(),
            startup_timeout: STARTUP_TIMEOUT,
            state_tx: Arc::new(state_tx),
        }
    }

    /// Override the profile resolution policy.
    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the startup watchdog duration.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Subscribe to provider changes and begin publishing state.
    ///
    /// Call once. The state moves to `Initializing` immediately; the event
    /// loop runs until the provider's change stream closes.
    pub fn start(&self) {
        let events = self.provider.subscribe();
        self.state_tx.send_replace(AuthState::Initializing);

        tokio::spawn(run_event_loop(
            events,
            self.resolver.clone(),
            self.policy,
            self.startup_timeout,
            self.state_tx.clone(),
        ));
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Watch state changes.
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Sign in with email and password.
    ///
    /// On success the resolved user is published before this returns; the
    /// provider's own signed-in event may resolve again afterwards, which
    /// lands on the same slot.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        resolve_and_publish(&self.resolver, &self.policy, &self.state_tx, &session).await;
        Ok(())
    }

    /// Sign in a kid with a user ID and PIN.
    ///
    /// Exchanges the PIN for a one-time token and redeems it. Returns as
    /// soon as redemption succeeds; the published state updates through the
    /// provider's signed-in event.
    pub async fn sign_in_with_pin(&self, user_id: &str, pin: &str) -> Result<(), ProviderError> {
        let grant = self.exchanger.exchange_pin(user_id, pin).await?;
        self.provider.redeem_token(&grant.token).await?;
        Ok(())
    }

    /// Sign out.
    ///
    /// Local state clears even when the provider call fails; the session is
    /// gone from the client's point of view either way.
    pub async fn sign_out(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "provider sign-out failed, clearing local state anyway");
        }
        self.state_tx.send_replace(AuthState::Unauthenticated);
    }

    /// Re-resolve and republish the current user. No-op without a session.
    pub async fn refresh_user(&self) {
        match self.provider.current_session().await {
            Some(session) => {
                resolve_and_publish(&self.resolver, &self.policy, &self.state_tx, &session).await;
            }
            None => debug!("refresh requested without a session"),
        }
    }
}

/// Resolve a session's profile under the policy and publish the user.
async fn resolve_and_publish(
    resolver: &Arc<dyn ProfileResolver>,
    policy: &ResolvePolicy,
    state_tx: &watch::Sender<AuthState>,
    session: &Session,
) {
    let profile = resolve_with_policy(
        policy,
        || resolver.resolve(session),
        || degraded_profile(session),
    )
    .await;

    let user = AuthenticatedUser {
        id: session.user_id.clone(),
        email: session.email.clone(),
        name: profile.name,
        role: profile.role,
    };
    info!(user_id = %user.id, role = ?user.role, "publishing authenticated user");
    state_tx.send_replace(AuthState::Authenticated(user));
}

async fn run_event_loop(
    mut events: broadcast::Receiver<AuthChange>,
    resolver: Arc<dyn ProfileResolver>,
    policy: ResolvePolicy,
    startup_timeout: Duration,
    state_tx: Arc<watch::Sender<AuthState>>,
) {
    // Events are ignored until the provider's first initial-session
    // snapshot arrives. The watchdog only bounds the loading state; a late
    // snapshot still applies after it fires.
    let mut initialized = false;
    let mut watchdog_armed = true;
    let watchdog = tokio::time::sleep(startup_timeout);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            _ = watchdog.as_mut(), if watchdog_armed && !initialized => {
                watchdog_armed = false;
                warn!(timeout = ?startup_timeout, "no initial session before watchdog, publishing unauthenticated");
                state_tx.send_replace(AuthState::Unauthenticated);
            }
            event = events.recv() => match event {
                Ok(change) => {
                    handle_change(change, &mut initialized, &resolver, &policy, &state_tx).await;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "auth change stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("auth change stream closed, stopping controller loop");
                    break;
                }
            }
        }
    }
}

async fn handle_change(
    change: AuthChange,
    initialized: &mut bool,
    resolver: &Arc<dyn ProfileResolver>,
    policy: &ResolvePolicy,
    state_tx: &watch::Sender<AuthState>,
) {
    match change {
        AuthChange::InitialSession(session) => {
            *initialized = true;
            match session {
                Some(session) => {
                    debug!(user_id = %session.user_id, "initial session restored");
                    resolve_and_publish(resolver, policy, state_tx, &session).await;
                }
                None => {
                    debug!("no initial session");
                    state_tx.send_replace(AuthState::Unauthenticated);
                }
            }
        }
        _ if !*initialized => {
            debug!("ignoring auth change before initial session");
        }
        AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => {
            resolve_and_publish(resolver, policy, state_tx, &session).await;
        }
        AuthChange::SignedOut => {
            state_tx.send_replace(AuthState::Unauthenticated);
        }
    }
}
