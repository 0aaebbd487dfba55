use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::role::{RoleCreate, RoleResponse, RoleUpdate};
use crate::schemas::Ack;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:role_id", get(get_role).put(update_role).delete(delete_role))
}

async fn list_roles(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<RoleResponse>>, ApiError> {
    let roles = repositories::roles::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list roles"))?;
    Ok(Json(roles.into_iter().map(RoleResponse::from_db).collect()))
}

async fn create_role(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<RoleCreate>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let role = repositories::roles::create(
        state.db(),
        repositories::roles::CreateRole {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            name: &payload.name,
            permission: payload.permission,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Role", "Failed to create role"))?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from_db(role))))
}

async fn get_role(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = repositories::roles::find_by_id(state.db(), &role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch role"))?
        .ok_or(ApiError::NotFound("Role"))?;
    Ok(Json(RoleResponse::from_db(role)))
}

async fn update_role(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<RoleUpdate>,
) -> Result<Json<RoleResponse>, ApiError> {
    validate_payload(&payload)?;

    let role = repositories::roles::update(
        state.db(),
        &role_id,
        repositories::roles::UpdateRole {
            slug: payload.slug,
            name: payload.name,
            permission: payload.permission,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Role", "Failed to update role"))?
    .ok_or(ApiError::NotFound("Role"))?;

    Ok(Json(RoleResponse::from_db(role)))
}

async fn delete_role(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    if repositories::roles::find_by_id(state.db(), &role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch role"))?
        .is_none()
    {
        return Err(ApiError::NotFound("Role"));
    }

    let in_use = repositories::roles::count_users(state.db(), &role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count role users"))?;
    if in_use > 0 {
        return Err(ApiError::ForbiddenAccessParameter(
            "Role is still assigned to users".to_string(),
        ));
    }

    repositories::roles::delete(state.db(), &role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete role"))?;
    tracing::info!(action = "role_delete", role_id = %role_id, "Role deleted");
    Ok(Json(Ack::Deleted))
}
