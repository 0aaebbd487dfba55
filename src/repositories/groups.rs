use sqlx::PgPool;

use crate::db::models::{Group, Label, User};

const COLUMNS: &str = "id, slug, name, created_at, updated_at";

pub(crate) struct CreateGroup<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) name: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateGroup {
    pub(crate) slug: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateGroup<'_>) -> Result<Group, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!(
        "INSERT INTO groups (id, slug, name, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.slug)
    .bind(params.name)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!("SELECT {COLUMNS} FROM groups WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!("SELECT {COLUMNS} FROM groups ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateGroup,
) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!(
        "UPDATE groups SET
            slug = COALESCE($1, slug),
            name = COALESCE($2, name),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(params.slug)
    .bind(params.name)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM groups WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Returns `false` when the user was already a member.
pub(crate) async fn add_user(
    pool: &PgPool,
    group_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO group_users (group_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_user(
    pool: &PgPool,
    group_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM group_users WHERE group_id = $1 AND user_id = $2")
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn add_label(
    pool: &PgPool,
    group_id: &str,
    label_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO group_labels (group_id, label_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(label_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_label(
    pool: &PgPool,
    group_id: &str,
    label_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM group_labels WHERE group_id = $1 AND label_id = $2")
        .bind(group_id)
        .bind(label_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn user_ids(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT user_id FROM group_users WHERE group_id = $1")
        .bind(group_id)
        .fetch_all(executor)
        .await
}

/// Groups sharing at least one member with `user_ids`.
pub(crate) async fn ids_containing_users(
    executor: impl sqlx::PgExecutor<'_>,
    user_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT group_id FROM group_users WHERE user_id = ANY($1) ORDER BY group_id",
    )
    .bind(user_ids)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_users(pool: &PgPool, group_id: &str) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.hashed_password, u.gender,
                u.role_id, u.created_at, u.updated_at
         FROM users u JOIN group_users gu ON gu.user_id = u.id
         WHERE gu.group_id = $1
         ORDER BY u.last_name, u.first_name",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_labels(pool: &PgPool, group_id: &str) -> Result<Vec<Label>, sqlx::Error> {
    sqlx::query_as::<_, Label>(
        "SELECT l.id, l.slug, l.name, l.created_at, l.updated_at
         FROM labels l JOIN group_labels gl ON gl.label_id = l.id
         WHERE gl.group_id = $1
         ORDER BY l.name",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}
