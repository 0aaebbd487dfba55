//! Groups, labels and specifications: flat slug/name catalogs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentProfessor};
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::catalog::{CatalogCreate, CatalogResponse, CatalogUpdate, GroupDetailResponse};
use crate::schemas::user::UserResponse;
use crate::schemas::Ack;

pub(crate) fn groups_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:group_id", get(get_group).put(update_group).delete(delete_group))
        .route("/:group_id/users/:user_id", post(add_group_user).delete(remove_group_user))
        .route("/:group_id/labels/:label_id", post(add_group_label).delete(remove_group_label))
}

pub(crate) fn labels_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_labels).post(create_label))
        .route("/:label_id", get(get_label).put(update_label).delete(delete_label))
}

pub(crate) fn specifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_specifications).post(create_specification))
        .route(
            "/:specification_id",
            get(get_specification).put(update_specification).delete(delete_specification),
        )
}

async fn list_groups(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<CatalogResponse>>, ApiError> {
    let groups = repositories::groups::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list groups"))?;
    Ok(Json(groups.into_iter().map(CatalogResponse::from).collect()))
}

async fn create_group(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<CatalogCreate>,
) -> Result<(StatusCode, Json<CatalogResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let group = repositories::groups::create(
        state.db(),
        repositories::groups::CreateGroup {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            name: &payload.name,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Group", "Failed to create group"))?;

    Ok((StatusCode::CREATED, Json(CatalogResponse::from(group))))
}

async fn get_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<GroupDetailResponse>, ApiError> {
    let group = repositories::groups::find_by_id(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch group"))?
        .ok_or(ApiError::NotFound("Group"))?;
    let users = repositories::groups::list_users(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list group users"))?;
    let labels = repositories::groups::list_labels(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list group labels"))?;

    Ok(Json(GroupDetailResponse {
        group: CatalogResponse::from(group),
        users: users.into_iter().map(UserResponse::from_db).collect(),
        labels: labels.into_iter().map(CatalogResponse::from).collect(),
    }))
}

async fn update_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<CatalogUpdate>,
) -> Result<Json<CatalogResponse>, ApiError> {
    validate_payload(&payload)?;

    let group = repositories::groups::update(
        state.db(),
        &group_id,
        repositories::groups::UpdateGroup {
            slug: payload.slug,
            name: payload.name,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Group", "Failed to update group"))?
    .ok_or(ApiError::NotFound("Group"))?;

    Ok(Json(CatalogResponse::from(group)))
}

async fn delete_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    let deleted = repositories::groups::delete(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete group"))?;
    if !deleted {
        return Err(ApiError::NotFound("Group"));
    }
    tracing::info!(action = "group_delete", group_id = %group_id, "Group deleted");
    Ok(Json(Ack::Deleted))
}

async fn add_group_user(
    Path((group_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    ensure_group(&state, &group_id).await?;
    if !repositories::users::exists(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
    {
        return Err(ApiError::NotFound("User"));
    }

    let added = repositories::groups::add_user(state.db(), &group_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to add group user"))?;
    if !added {
        return Err(ApiError::Duplication("Group member"));
    }
    tracing::info!(
        action = "group_user_add",
        group_id = %group_id,
        user_id = %user_id,
        "Member added"
    );
    Ok(Json(Ack::Added))
}

async fn remove_group_user(
    Path((group_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    let removed = repositories::groups::remove_user(state.db(), &group_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove group user"))?;
    if !removed {
        return Err(ApiError::NotFound("Group member"));
    }
    Ok(Json(Ack::Removed))
}

async fn add_group_label(
    Path((group_id, label_id)): Path<(String, String)>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    ensure_group(&state, &group_id).await?;
    repositories::labels::find_by_id(state.db(), &label_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch label"))?
        .ok_or(ApiError::NotFound("Label"))?;

    let added = repositories::groups::add_label(state.db(), &group_id, &label_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to add group label"))?;
    if !added {
        return Err(ApiError::Duplication("Group label"));
    }
    Ok(Json(Ack::Added))
}

async fn remove_group_label(
    Path((group_id, label_id)): Path<(String, String)>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    let removed = repositories::groups::remove_label(state.db(), &group_id, &label_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove group label"))?;
    if !removed {
        return Err(ApiError::NotFound("Group label"));
    }
    Ok(Json(Ack::Removed))
}

async fn ensure_group(state: &AppState, group_id: &str) -> Result<(), ApiError> {
    repositories::groups::find_by_id(state.db(), group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch group"))?
        .ok_or(ApiError::NotFound("Group"))?;
    Ok(())
}

async fn list_labels(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<CatalogResponse>>, ApiError> {
    let labels = repositories::labels::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list labels"))?;
    Ok(Json(labels.into_iter().map(CatalogResponse::from).collect()))
}

async fn create_label(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<CatalogCreate>,
) -> Result<(StatusCode, Json<CatalogResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let label = repositories::labels::create(
        state.db(),
        repositories::labels::CreateLabel {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            name: &payload.name,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Label", "Failed to create label"))?;

    Ok((StatusCode::CREATED, Json(CatalogResponse::from(label))))
}

async fn get_label(
    Path(label_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<CatalogResponse>, ApiError> {
    let label = repositories::labels::find_by_id(state.db(), &label_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch label"))?
        .ok_or(ApiError::NotFound("Label"))?;
    Ok(Json(CatalogResponse::from(label)))
}

async fn update_label(
    Path(label_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    JsonBody(payload): JsonBody<CatalogUpdate>,
) -> Result<Json<CatalogResponse>, ApiError> {
    validate_payload(&payload)?;

    let label = repositories::labels::update(
        state.db(),
        &label_id,
        repositories::labels::UpdateLabel {
            slug: payload.slug,
            name: payload.name,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Label", "Failed to update label"))?
    .ok_or(ApiError::NotFound("Label"))?;

    Ok(Json(CatalogResponse::from(label)))
}

async fn delete_label(
    Path(label_id): Path<String>,
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Ack>, ApiError> {
    let deleted = repositories::labels::delete(state.db(), &label_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete label"))?;
    if !deleted {
        return Err(ApiError::NotFound("Label"));
    }
    Ok(Json(Ack::Deleted))
}

async fn list_specifications(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<CatalogResponse>>, ApiError> {
    let specifications = repositories::specifications::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list specifications"))?;
    Ok(Json(specifications.into_iter().map(CatalogResponse::from).collect()))
}

async fn create_specification(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<CatalogCreate>,
) -> Result<(StatusCode, Json<CatalogResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let specification = repositories::specifications::create(
        state.db(),
        repositories::specifications::CreateSpecification {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            name: &payload.name,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Specification", "Failed to create specification"))?;

    Ok((StatusCode::CREATED, Json(CatalogResponse::from(specification))))
}

async fn get_specification(
    Path(specification_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<CatalogResponse>, ApiError> {
    let specification = repositories::specifications::find_by_id(state.db(), &specification_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch specification"))?
        .ok_or(ApiError::NotFound("Specification"))?;
    Ok(Json(CatalogResponse::from(specification)))
}

async fn update_specification(
    Path(specification_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<CatalogUpdate>,
) -> Result<Json<CatalogResponse>, ApiError> {
    validate_payload(&payload)?;

    let specification = repositories::specifications::update(
        state.db(),
        &specification_id,
        repositories::specifications::UpdateSpecification {
            slug: payload.slug,
            name: payload.name,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Specification", "Failed to update specification"))?
    .ok_or(ApiError::NotFound("Specification"))?;

    Ok(Json(CatalogResponse::from(specification)))
}

async fn delete_specification(
    Path(specification_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let deleted = repositories::specifications::delete(state.db(), &specification_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete specification"))?;
    if !deleted {
        return Err(ApiError::NotFound("Specification"));
    }
    Ok(Json(Ack::Deleted))
}
