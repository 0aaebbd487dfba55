use sqlx::PgPool;

use crate::db::models::{Group, User, UserWithRole};

const COLUMNS: &str = "\
    id, username, first_name, last_name, hashed_password, gender, role_id, \
    created_at, updated_at";

const JOINED_COLUMNS: &str = "\
    u.id, u.username, u.first_name, u.last_name, u.hashed_password, u.gender, u.role_id, \
    u.created_at, u.updated_at, r.slug AS role_slug, r.permission AS role_permission";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_with_role_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserWithRole>, sqlx::Error> {
    sqlx::query_as::<_, UserWithRole>(&format!(
        "SELECT {JOINED_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id
         WHERE u.username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_with_role_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<UserWithRole>, sqlx::Error> {
    sqlx::query_as::<_, UserWithRole>(&format!(
        "SELECT {JOINED_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY last_name, first_name, username"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn exists(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) gender: Option<&'a str>,
    pub(crate) role_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, first_name, last_name, hashed_password, gender, role_id,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.hashed_password)
    .bind(params.gender)
    .bind(params.role_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateUser {
    pub(crate) username: Option<String>,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) hashed_password: Option<String>,
    pub(crate) role_id: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateUser,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            username = COALESCE($1, username),
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            gender = COALESCE($4, gender),
            hashed_password = COALESCE($5, hashed_password),
            role_id = COALESCE($6, role_id),
            updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}",
    ))
    .bind(params.username)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.gender)
    .bind(params.hashed_password)
    .bind(params.role_id)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn group_ids(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT group_id FROM group_users WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_groups(pool: &PgPool, user_id: &str) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        "SELECT g.id, g.slug, g.name, g.created_at, g.updated_at
         FROM groups g JOIN group_users gu ON gu.group_id = g.id
         WHERE gu.user_id = $1
         ORDER BY g.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
