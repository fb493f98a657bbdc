//! Database-backed identity collaborators.
//!
//! These implement the credential store and token issuer the PIN exchange
//! depends on.

mod issuer;
mod store;

pub use issuer::SqlTokenIssuer;
pub use store::SqlCredentialStore;
