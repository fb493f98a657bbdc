//! Client Session Tests
//!
//! End-to-end tests driving the HTTP client and session controller
//! against a live server on an ephemeral port.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chorely::auth::{AuthState, IdentityProvider, SessionController};
use chorely::client::{AuthApi, HttpIdentityProvider, HttpProfileResolver};
use chorely::{Database, Role, WebServer};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Stack {
    db: Database,
    addr: std::net::SocketAddr,
    provider: Arc<HttpIdentityProvider>,
    controller: SessionController,
}

/// Boot a server on an ephemeral port and wire a controller to it.
async fn start_stack() -> Stack {
    let config = common::test_server_config();
    let db = Database::open_in_memory().await.expect("open database");

    let server = WebServer::new(&config, db.clone());
    let addr = server.run_with_addr().await.expect("bind server");

    let api = AuthApi::new(&format!("http://{}", addr)).expect("api client");
    let provider = Arc::new(HttpIdentityProvider::new(api.clone()));
    let resolver = Arc::new(HttpProfileResolver::new(api));

    let controller = SessionController::new(provider.clone(), provider.clone(), resolver);

    Stack {
        db,
        addr,
        provider,
        controller,
    }
}

/// Start the controller and wait for the empty initial snapshot.
async fn start_signed_out(stack: &Stack) {
    stack.controller.start();
    stack.provider.initialize().await;
    wait_for(&stack.controller, |s| *s == AuthState::Unauthenticated).await;
}

async fn wait_for<F>(controller: &SessionController, mut pred: F) -> AuthState
where
    F: FnMut(&AuthState) -> bool,
{
    let mut rx = controller.watch();
    let state = timeout(WAIT, rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for auth state")
        .expect("controller state channel closed")
        .clone();
    state
}

#[tokio::test]
async fn test_kid_pin_sign_in_end_to_end() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;

    stack
        .controller
        .sign_in_with_pin(&kid.id, "1234")
        .await
        .expect("PIN sign-in failed");

    let state = wait_for(&stack.controller, |s| s.is_authenticated()).await;
    let user = state.user().unwrap();
    assert_eq!(user.id, kid.id);
    assert_eq!(user.email, "kid@example.com");
    assert_eq!(user.name, "Kid One");
    assert_eq!(user.role, Some(Role::Kid));
    assert!(!user.is_parent());

    let session = stack.provider.current_session().await.expect("no session");
    assert!(!session.access_token.is_empty());
    assert!(!session.refresh_token.is_empty());
}

#[tokio::test]
async fn test_wrong_pin_surfaces_server_message() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;

    let err = stack
        .controller
        .sign_in_with_pin(&kid.id, "9999")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid PIN or user ID");

    assert_eq!(stack.controller.state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_malformed_pin_surfaces_server_message() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;

    let err = stack
        .controller
        .sign_in_with_pin(&kid.id, "12")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "PIN must be 4 digits");
}

#[tokio::test]
async fn test_parent_password_sign_in_publishes_before_returning() {
    let stack = start_stack().await;
    common::seed_parent(&stack.db, "parent@example.com", "Parent One", "password123").await;

    start_signed_out(&stack).await;

    stack
        .controller
        .sign_in("parent@example.com", "password123")
        .await
        .expect("password sign-in failed");

    // No waiting: the state was published before sign_in returned
    let state = stack.controller.state();
    let user = state.user().expect("not authenticated");
    assert_eq!(user.name, "Parent One");
    assert_eq!(user.role, Some(Role::Parent));
    assert!(user.is_parent());
}

#[tokio::test]
async fn test_bad_password_error_message_verbatim() {
    let stack = start_stack().await;
    common::seed_parent(&stack.db, "parent@example.com", "Parent One", "password123").await;

    start_signed_out(&stack).await;

    let err = stack
        .controller
        .sign_in("parent@example.com", "wrongpassword")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password");

    assert_eq!(stack.controller.state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_sign_out_clears_state() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;

    stack
        .controller
        .sign_in_with_pin(&kid.id, "1234")
        .await
        .expect("PIN sign-in failed");
    wait_for(&stack.controller, |s| s.is_authenticated()).await;

    stack.controller.sign_out().await;

    assert_eq!(stack.controller.state(), AuthState::Unauthenticated);
    assert!(stack.provider.current_session().await.is_none());
}

#[tokio::test]
async fn test_refresh_session_rotates_tokens_and_keeps_user() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;

    stack
        .controller
        .sign_in_with_pin(&kid.id, "1234")
        .await
        .expect("PIN sign-in failed");
    wait_for(&stack.controller, |s| s.is_authenticated()).await;

    let before = stack.provider.current_session().await.expect("no session");
    let after = stack
        .provider
        .refresh_session()
        .await
        .expect("refresh failed");

    assert_eq!(after.user_id, before.user_id);
    assert_ne!(after.refresh_token, before.refresh_token);

    // Still signed in as the same kid after the token refresh event
    let state = wait_for(&stack.controller, |s| s.is_authenticated()).await;
    assert_eq!(state.user().unwrap().id, kid.id);
}

#[tokio::test]
async fn test_persisted_refresh_token_restores_session_on_startup() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;
    stack
        .controller
        .sign_in_with_pin(&kid.id, "1234")
        .await
        .expect("PIN sign-in failed");
    wait_for(&stack.controller, |s| s.is_authenticated()).await;
    let saved = stack
        .provider
        .current_session()
        .await
        .expect("no session")
        .refresh_token;

    // A later app run restores the session from the saved token
    let api = AuthApi::new(&format!("http://{}", stack.addr)).expect("api client");
    let provider =
        Arc::new(HttpIdentityProvider::new(api.clone()).with_persisted_refresh_token(saved));
    let resolver = Arc::new(HttpProfileResolver::new(api));
    let controller = SessionController::new(provider.clone(), provider.clone(), resolver);

    controller.start();
    provider.initialize().await;

    let state = wait_for(&controller, |s| s.is_authenticated()).await;
    assert_eq!(state.user().unwrap().id, kid.id);
    assert_eq!(state.user().unwrap().role, Some(Role::Kid));
}

#[tokio::test]
async fn test_redeemed_token_is_dead_after_sign_in() {
    let stack = start_stack().await;
    let kid = common::seed_kid(&stack.db, "kid@example.com", "Kid One", "1234").await;

    start_signed_out(&stack).await;

    // Grab the one-time token by doing the exchange half manually
    use chorely::auth::PinExchanger;
    let grant = stack
        .provider
        .exchange_pin(&kid.id, "1234")
        .await
        .expect("exchange failed");

    use chorely::auth::IdentityProvider;
    stack
        .provider
        .redeem_token(&grant.token)
        .await
        .expect("redeem failed");

    // Second redemption of the same token fails
    let err = stack.provider.redeem_token(&grant.token).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid or expired token");
}
