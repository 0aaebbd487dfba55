use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::redis::login_rate_key;
use crate::core::security::{self, TokenSubject};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, MeResponse, TokenResponse};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", post(login)).route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_payload(&payload)?;

    let security_settings = state.settings().security();
    let allowed = state
        .redis()
        .rate_limit(
            &login_rate_key(&payload.username),
            security_settings.login_rate_limit,
            security_settings.login_rate_window_seconds,
        )
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let found = repositories::users::find_with_role_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;
    let Some(found) = found else {
        return Err(ApiError::InvalidCredentials);
    };

    let verified = security::verify_password(&payload.password, &found.user.hashed_password)
        .map_err(|_| ApiError::InvalidCredentials)?;
    if !verified {
        return Err(ApiError::InvalidCredentials);
    }

    let token = security::create_access_token(
        TokenSubject {
            user_id: &found.user.id,
            username: &found.user.username,
            role: &found.role_slug,
            role_permission: found.role_permission,
        },
        state.settings(),
        None,
    )
    .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(action = "login", user_id = %found.user.id, "User logged in");
    Ok(Json(TokenResponse { token }))
}

async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let found = repositories::users::find_with_role_by_id(state.db(), current.id())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(MeResponse {
        user: UserResponse::from_db(found.user),
        role: found.role_slug,
        role_permission: found.role_permission,
    }))
}
