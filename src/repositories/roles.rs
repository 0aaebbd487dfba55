use sqlx::PgPool;

use crate::db::models::Role;

const COLUMNS: &str = "id, slug, name, permission, created_at, updated_at";

pub(crate) struct CreateRole<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) name: &'a str,
    pub(crate) permission: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateRole {
    pub(crate) slug: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) permission: Option<i32>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateRole<'_>) -> Result<Role, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!(
        "INSERT INTO roles (id, slug, name, permission, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.slug)
    .bind(params.name)
    .bind(params.permission)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!("SELECT {COLUMNS} FROM roles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!("SELECT {COLUMNS} FROM roles WHERE slug = $1"))
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!("SELECT {COLUMNS} FROM roles ORDER BY permission, slug"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateRole,
) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!(
        "UPDATE roles SET
            slug = COALESCE($1, slug),
            name = COALESCE($2, name),
            permission = COALESCE($3, permission),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.slug)
    .bind(params.name)
    .bind(params.permission)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_users(pool: &PgPool, role_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = $1")
        .bind(role_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM roles WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
