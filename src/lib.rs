//! Chorely - household chore tracker auth service
//!
//! PIN-based kid sign-in, one-time token redemption, and client-side
//! session state management.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, hash_pin, validate_pin, verify_password, verify_pin, AuthChange, AuthState,
    AuthenticatedUser, CredentialStore, ExchangeError, IdentityProvider, PasswordError,
    PinError, PinExchange, PinExchanger, PinGrant, Profile, ProfileError, ProfileResolver,
    ProviderError, ResolvePolicy, Session, SessionController, TokenIssuer, UserIdentity,
};
pub use client::{AuthApi, HttpIdentityProvider, HttpProfileResolver};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use error::{ChorelyError, Result};
pub use identity::{SqlCredentialStore, SqlTokenIssuer};
pub use web::WebServer;
