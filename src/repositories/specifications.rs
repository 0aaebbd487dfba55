use sqlx::PgPool;

use crate::db::models::Specification;

const COLUMNS: &str = "id, slug, name, created_at, updated_at";

pub(crate) struct CreateSpecification<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) name: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateSpecification {
    pub(crate) slug: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSpecification<'_>,
) -> Result<Specification, sqlx::Error> {
    sqlx::query_as::<_, Specification>(&format!(
        "INSERT INTO specifications (id, slug, name, created_at, updated_at)
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
    pool: &PgPool,
    id: &str,
) -> Result<Option<Specification>, sqlx::Error> {
    sqlx::query_as::<_, Specification>(&format!(
        "SELECT {COLUMNS} FROM specifications WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Specification>, sqlx::Error> {
    sqlx::query_as::<_, Specification>(&format!(
        "SELECT {COLUMNS} FROM specifications ORDER BY name"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSpecification,
) -> Result<Option<Specification>, sqlx::Error> {
    sqlx::query_as::<_, Specification>(&format!(
        "UPDATE specifications SET
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
    let result =
        sqlx::query("DELETE FROM specifications WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
