//! API handlers for the Web API.

pub mod auth;
pub mod kids;

pub use auth::*;
pub use kids::*;
