//! Kid account management handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::{NewUser, UserRepository};
use crate::web::dto::{CreateKidRequest, UserPayload, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::Role;

use super::auth::{map_create_user_error, AppState};

/// POST /api/kids - Create a kid account with a PIN.
pub async fn create_kid(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateKidRequest>,
) -> Result<Json<UserPayload>, ApiError> {
    if claims.role != Role::Parent.as_str() {
        return Err(ApiError::forbidden("Only parents can create kid accounts"));
    }

    let pin_hash = crate::auth::hash_pin(&req.pin).map_err(|e| match e {
        crate::auth::PinError::InvalidFormat => ApiError::invalid_request(e.to_string()),
        _ => {
            tracing::error!("PIN hashing failed: {}", e);
            ApiError::internal("Failed to hash PIN")
        }
    })?;

    let repo = UserRepository::new(state.db.pool());
    let new_user = NewUser::new(&req.email, &req.name)
        .with_role(Role::Kid)
        .with_pin_hash(pin_hash);
    let user = repo.create(&new_user).await.map_err(map_create_user_error)?;

    Ok(Json(UserPayload::from(&user)))
}
