//! Authentication module for Chorely.
//!
//! Server side: credential hashing and the PIN-for-token exchange.
//! Client side: the identity provider abstraction, profile resolution,
//! and the session controller that owns published auth state.

mod controller;
mod exchange;
mod password;
mod pin;
mod profile;
mod provider;

pub use controller::{AuthState, AuthenticatedUser, SessionController};
pub use exchange::{
    CredentialStore, ExchangeError, PinExchange, PinGrant, TokenIssuer, UserIdentity,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use pin::{hash_pin, validate_pin, verify_pin, PinError, PIN_LENGTH};
pub use profile::{
    fallback_display_name, resolve_with_policy, Profile, ProfileError, ProfileResolver,
    ResolvePolicy,
};
pub use provider::{AuthChange, IdentityProvider, PinExchanger, ProviderError, Session};

use argon2::{Argon2, Params};

/// Argon2id with 64 MB memory cost, 3 iterations, 4 lanes.
fn create_argon2() -> Argon2<'static> {
    let params = Params::new(65536, 3, 4, None).expect("valid Argon2 params");
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}
