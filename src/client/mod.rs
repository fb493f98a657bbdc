//! HTTP client layer for apps embedding the session controller.
//!
//! `AuthApi` wraps the REST endpoints; `HttpIdentityProvider` adapts them
//! to the provider traits the session controller consumes.

mod api;
mod provider;

pub use api::AuthApi;
pub use provider::{HttpIdentityProvider, HttpProfileResolver};
