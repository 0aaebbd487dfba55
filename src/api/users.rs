use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentProfessor, CurrentUser};
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::catalog::CatalogResponse;
use crate::schemas::user::{UserCreate, UserResponse, UserUpdate};
use crate::schemas::Ack;
use crate::services::permissions::{authorize, Check, Rank};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:user_id", get(get_user).put(update_user).delete(delete_user))
        .route("/:user_id/groups", get(list_user_groups))
}

async fn list_users(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = repositories::users::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_payload(&payload)?;

    ensure_role_exists(&state, &payload.role_id).await?;

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            hashed_password,
            gender: payload.gender.as_deref(),
            role_id: &payload.role_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "User", "Failed to create user"))?;

    tracing::info!(action = "user_create", user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

async fn get_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<UserResponse>, ApiError> {
    require_professor_or_self(&state, &current, &user_id)?;

    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(UserResponse::from_db(user)))
}

async fn update_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(payload): JsonBody<UserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(&state.ladder(), &current.caller, &[], &[Check::SelfOnly(&user_id)])?;
    validate_payload(&payload)?;

    if let Some(role_id) = payload.role_id.as_deref() {
        if !current.has_rank(&state, Rank::Admin) {
            return Err(ApiError::ForbiddenAccessParameter(
                "Only administrators can change roles".to_string(),
            ));
        }
        ensure_role_exists(&state, role_id).await?;
    }

    let hashed_password = match payload.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };

    let user = repositories::users::update(
        state.db(),
        &user_id,
        repositories::users::UpdateUser {
            username: payload.username,
            first_name: payload.first_name,
            last_name: payload.last_name,
            gender: payload.gender,
            hashed_password,
            role_id: payload.role_id,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "User", "Failed to update user"))?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserResponse::from_db(user)))
}

async fn delete_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    let deleted = repositories::users::delete(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete user"))?;
    if !deleted {
        return Err(ApiError::NotFound("User"));
    }

    tracing::info!(action = "user_delete", user_id = %user_id, "User deleted");
    Ok(Json(Ack::Deleted))
}

async fn list_user_groups(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CatalogResponse>>, ApiError> {
    require_professor_or_self(&state, &current, &user_id)?;

    if !repositories::users::exists(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
    {
        return Err(ApiError::NotFound("User"));
    }

    let groups = repositories::users::list_groups(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list user groups"))?;
    Ok(Json(groups.into_iter().map(CatalogResponse::from).collect()))
}

fn require_professor_or_self(
    state: &AppState,
    current: &CurrentUser,
    user_id: &str,
) -> Result<(), ApiError> {
    if current.id() == user_id || current.has_rank(state, Rank::Professor) {
        Ok(())
    } else {
        Err(ApiError::AccessForbidden)
    }
}

async fn ensure_role_exists(state: &AppState, role_id: &str) -> Result<(), ApiError> {
    repositories::roles::find_by_id(state.db(), role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch role"))?
        .ok_or(ApiError::NotFound("Role"))?;
    Ok(())
}

#[cfg(test)]
mod tests;
