//! Web server for the Chorely API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::ServerConfig;
use crate::db::{OneTimeTokenRepository, RefreshTokenRepository};
use crate::Database;

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, db: Database) -> Self {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .expect("Invalid web server address");

        Self {
            addr,
            app_state: Arc::new(AppState::new(db, config)),
            cors_origins: config.cors_origins.clone(),
        }
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the token cleanup background task.
    ///
    /// Runs every hour and removes expired/revoked refresh tokens and
    /// expired/used one-time tokens.
    fn start_token_cleanup_task(db: Database) {
        tokio::spawn(async move {
            const CLEANUP_INTERVAL_SECS: u64 = 3600;

            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let refresh_repo = RefreshTokenRepository::new(db.pool());
                match refresh_repo.cleanup_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(
                            deleted_count = count,
                            "Cleaned up expired/revoked refresh tokens"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!("No expired refresh tokens to clean up");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to cleanup refresh tokens");
                    }
                }

                let ott_repo = OneTimeTokenRepository::new(db.pool());
                match ott_repo.cleanup().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(
                            deleted_count = count,
                            "Cleaned up expired/used one-time tokens"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!("No expired one-time tokens to clean up");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to cleanup one-time tokens");
                    }
                }
            }
        });
    }

    /// Bind the listener and assemble the full router.
    async fn bind(self) -> Result<(TcpListener, Router, Database), std::io::Error> {
        let db = self.app_state.db.clone();

        let router = create_router(self.app_state, &self.cors_origins)
            .merge(create_health_router())
            .layer(CompressionLayer::new());

        let listener = TcpListener::bind(self.addr).await?;
        Ok((listener, router, db))
    }

    /// Run the web server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let (listener, router, db) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        // Start token cleanup background task after successful bind
        Self::start_token_cleanup_task(db);
        tracing::info!("Token cleanup task started (runs every hour)");

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
        let (listener, router, db) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        Self::start_token_cleanup_task(db);
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
