//! Shared helpers for integration tests.

#![allow(dead_code)]

use chorely::auth::{hash_password, hash_pin};
use chorely::config::ServerConfig;
use chorely::db::NewUser;
use chorely::{Database, Role, User, UserRepository};

/// Server configuration for tests. Port 0 binds an ephemeral port.
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        jwt_access_token_expiry_secs: 900,
        jwt_refresh_token_expiry_days: 7,
        one_time_token_expiry_mins: 10,
    }
}

/// Insert a parent account with a password.
pub async fn seed_parent(db: &Database, email: &str, name: &str, password: &str) -> User {
    let repo = UserRepository::new(db.pool());
    let new_user = NewUser::new(email, name)
        .with_role(Role::Parent)
        .with_password_hash(hash_password(password).expect("hash password"));
    repo.create(&new_user).await.expect("create parent")
}

/// Insert a kid account with a PIN.
pub async fn seed_kid(db: &Database, email: &str, name: &str, pin: &str) -> User {
    let repo = UserRepository::new(db.pool());
    let new_user = NewUser::new(email, name)
        .with_role(Role::Kid)
        .with_pin_hash(hash_pin(pin).expect("hash pin"));
    repo.create(&new_user).await.expect("create kid")
}

/// Insert a parent that also carries a PIN hash.
///
/// Exercises the role gate on PIN login, which only trips when the
/// credential check itself passes.
pub async fn seed_parent_with_pin(db: &Database, email: &str, name: &str, pin: &str) -> User {
    let repo = UserRepository::new(db.pool());
    let new_user = NewUser::new(email, name)
        .with_role(Role::Parent)
        .with_pin_hash(hash_pin(pin).expect("hash pin"));
    repo.create(&new_user).await.expect("create parent")
}
