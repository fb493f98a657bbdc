//! Profile resolution with timeout, retry, and degraded fallback.
//!
//! Raw sessions only carry base identity. The role and display name come
//! from a profile lookup, which may be slow or down. Resolution retries a
//! bounded number of times and then degrades instead of blocking the UI:
//! the role is left unresolved (callers treat that as not-a-parent) and the
//! name falls back to whatever identity facts are on hand.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::provider::Session;
use crate::db::Role;

/// Resolved application profile for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Display name.
    pub name: String,
    /// Role. `None` when resolution degraded; treat as least privilege.
    pub role: Option<Role>,
}

/// Errors from a profile lookup attempt.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The lookup call failed.
    #[error("profile lookup failed: {0}")]
    Lookup(String),

    /// The lookup succeeded but no profile exists for the user.
    #[error("profile not found")]
    NotFound,
}

/// Profile lookup service.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Fetch the profile for a session.
    async fn resolve(&self, session: &Session) -> Result<Profile, ProfileError>;
}

/// Retry policy for profile resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolvePolicy {
    /// Hard timeout per attempt.
    pub attempt_timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// Run `attempt` under the policy, falling back after the retry budget.
///
/// Each attempt races against `attempt_timeout`. Timeouts and errors count
/// the same; attempts are separated by `retry_delay`. The fallback makes
/// the result infallible, so transient lookup trouble never reaches the UI
/// as an error.
pub async fn resolve_with_policy<A, Fut, F>(
    policy: &ResolvePolicy,
    mut attempt: A,
    fallback: F,
) -> Profile
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<Profile, ProfileError>>,
    F: FnOnce() -> Profile,
{
    let attempts = policy.max_retries + 1;
    for n in 1..=attempts {
        match timeout(policy.attempt_timeout, attempt()).await {
            Ok(Ok(profile)) => {
                if n > 1 {
                    debug!(attempt = n, "profile resolved after retry");
                }
                return profile;
            }
            Ok(Err(e)) => warn!(attempt = n, error = %e, "profile lookup failed"),
            Err(_) => warn!(attempt = n, "profile lookup timed out"),
        }
        if n < attempts {
            sleep(policy.retry_delay).await;
        }
    }

    warn!("profile resolution exhausted retries, using fallback");
    fallback()
}

/// Pick a display name from available identity facts.
///
/// Preference order: sign-up metadata name, then the local part of the
/// email, then a generic placeholder.
pub fn fallback_display_name(metadata_name: Option<&str>, email: &str) -> String {
    if let Some(name) = metadata_name {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    let local = email.split('@').next().unwrap_or("");
    if !local.is_empty() {
        return local.to_string();
    }
    "User".to_string()
}

/// Degraded profile for a session whose lookup never succeeded.
pub fn degraded_profile(session: &Session) -> Profile {
    Profile {
        name: fallback_display_name(session.metadata_name.as_deref(), &session.email),
        role: None,
    }
}
