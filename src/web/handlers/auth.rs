//! Authentication handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::PinExchange;
use crate::config::ServerConfig;
use crate::db::{
    NewRefreshToken, NewUser, OneTimeTokenRepository, RefreshTokenRepository, TokenPurpose, User,
    UserRepository,
};
use crate::identity::{SqlCredentialStore, SqlTokenIssuer};
use crate::web::dto::{
    AppJson, LoginRequest, LogoutRequest, OkResponse, PinLoginRequest, PinLoginResponse,
    RedeemTokenRequest, RefreshRequest, RegisterRequest, SessionResponse, UserPayload,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims, JwtState};
use crate::{Database, Role};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// PIN-for-token exchange over the database-backed store and issuer.
    pub exchange: Arc<PinExchange>,
    /// JWT signing and verification state.
    pub jwt: Arc<JwtState>,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry_days: i64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, config: &ServerConfig) -> Self {
        let store = Arc::new(SqlCredentialStore::new(db.clone()));
        let issuer = Arc::new(
            SqlTokenIssuer::new(db.clone())
                .with_ttl_mins(config.one_time_token_expiry_mins as i64),
        );

        Self {
            db,
            exchange: Arc::new(PinExchange::new(store, issuer)),
            jwt: Arc::new(JwtState::new(&config.jwt_secret)),
            access_token_expiry: config.jwt_access_token_expiry_secs,
            refresh_token_expiry_days: config.jwt_refresh_token_expiry_days as i64,
        }
    }

    /// Issue an access token and a stored refresh token for a user.
    async fn create_session(&self, user: &User) -> Result<SessionResponse, ApiError> {
        let claims = JwtClaims::new(
            &user.id,
            &user.email,
            user.role.as_str(),
            self.access_token_expiry,
        );
        let access_token = self.jwt.sign(&claims).map_err(|e| {
            tracing::error!("Failed to sign access token: {}", e);
            ApiError::internal("Failed to create session")
        })?;

        let expires_at = chrono::Utc::now() + chrono::Duration::days(self.refresh_token_expiry_days);
        let repo = RefreshTokenRepository::new(self.db.pool());
        let refresh = repo
            .create(&NewRefreshToken {
                user_id: user.id.clone(),
                expires_at: expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .await
            .map_err(|e| {
                tracing::error!("Failed to store refresh token: {}", e);
                ApiError::internal("Failed to create session")
            })?;

        Ok(SessionResponse {
            access_token,
            refresh_token: refresh.id,
            expires_in: self.access_token_expiry,
            user: UserPayload::from(user),
        })
    }
}

/// Map a unique-constraint failure on user creation to a client error.
pub(super) fn map_create_user_error(err: crate::ChorelyError) -> ApiError {
    let msg = err.to_string();
    if msg.contains("UNIQUE") || msg.contains("duplicate key") {
        ApiError::invalid_request("Email already registered")
    } else {
        tracing::error!("User creation failed: {}", msg);
        ApiError::internal("Failed to create user")
    }
}

/// POST /api/auth/pin-login - Exchange a kid's PIN for a one-time token.
pub async fn pin_login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<PinLoginRequest>,
) -> Result<Json<PinLoginResponse>, ApiError> {
    let grant = state.exchange.exchange(&req.user_id, &req.pin).await?;

    Ok(Json(PinLoginResponse {
        success: true,
        token: grant.token,
        user: UserPayload::from(&grant.user),
    }))
}

/// POST /api/auth/login - Password login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::invalid_request("Email and password are required"));
    }

    // Lookup failures and bad passwords are indistinguishable to the caller
    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_email(&req.email)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid email or password"))?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let Some(ref hash) = user.password_hash else {
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let verified = crate::auth::verify_password(&req.password, hash).unwrap_or(false);
    if !verified {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let session = state.create_session(&user).await?;
    Ok(Json(session))
}

/// POST /api/auth/token - Redeem a one-time token for a session.
pub async fn redeem_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RedeemTokenRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.token.is_empty() {
        return Err(ApiError::invalid_request("Token is required"));
    }

    let repo = OneTimeTokenRepository::new(state.db.pool());
    let token = repo
        .consume(&req.token, TokenPurpose::Session)
        .await
        .map_err(|e| {
            tracing::error!("Token redemption failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let users = UserRepository::new(state.db.pool());
    let user = users
        .get_by_email(&token.email)
        .await
        .map_err(|e| {
            tracing::error!("User lookup failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let session = state.create_session(&user).await?;
    Ok(Json(session))
}

/// POST /api/auth/refresh - Rotate a refresh token into a new session.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RefreshRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let repo = RefreshTokenRepository::new(state.db.pool());
    let token = repo
        .get_valid(&req.refresh_token)
        .await
        .map_err(|e| {
            tracing::error!("Refresh token lookup failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let users = UserRepository::new(state.db.pool());
    let user = users
        .get_by_id(&token.user_id)
        .await
        .map_err(|e| {
            tracing::error!("User lookup failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    // Rotation: the presented token is dead whether or not a new one is issued
    let _ = repo.revoke(&token.id).await;

    let session = state.create_session(&user).await?;
    Ok(Json(session))
}

/// POST /api/auth/logout - Revoke a refresh token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LogoutRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let repo = RefreshTokenRepository::new(state.db.pool());
    let _ = repo.revoke(&req.refresh_token).await;

    Ok(Json(OkResponse::new()))
}

/// POST /api/auth/register - Register a parent account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let password_hash = crate::auth::hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal("Failed to hash password")
    })?;

    let repo = UserRepository::new(state.db.pool());
    let new_user = NewUser::new(&req.email, &req.name)
        .with_role(Role::Parent)
        .with_password_hash(password_hash);
    let user = repo.create(&new_user).await.map_err(map_create_user_error)?;

    let session = state.create_session(&user).await?;
    Ok(Json(session))
}

/// GET /api/auth/me - Get the authenticated user's profile.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserPayload>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_id(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("User lookup failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserPayload::from(&user)))
}
