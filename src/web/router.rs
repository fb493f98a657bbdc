//! Router configuration for Web API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_kid, login, logout, me, pin_login, redeem_token, refresh, register, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let auth_routes = Router::new()
        .route("/pin-login", post(pin_login))
        .route("/login", post(login))
        .route("/token", post(redeem_token))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/me", get(me));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/kids", post(create_kid));

    // Clone jwt_state for the middleware closure
    let jwt_state = app_state.jwt.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
