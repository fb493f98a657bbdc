//! Web API module for Chorely.
//!
//! This module provides the REST API the household apps talk to: PIN and
//! password login, one-time token redemption, and session management.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
