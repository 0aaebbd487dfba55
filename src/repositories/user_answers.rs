use sqlx::PgPool;

use crate::db::models::UserAnswer;

const COLUMNS: &str =
    "id, answer_content, valid, user_id, question_id, event_id, created_at, updated_at";

pub(crate) struct CreateUserAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) answer_content: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) event_id: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn exists_for(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM user_answers WHERE user_id = $1 AND question_id = $2)",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUserAnswer<'_>,
) -> Result<UserAnswer, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "INSERT INTO user_answers (
            id, answer_content, valid, user_id, question_id, event_id, created_at, updated_at
         ) VALUES ($1,$2,NULL,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.answer_content)
    .bind(params.user_id)
    .bind(params.question_id)
    .bind(params.event_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!("SELECT {COLUMNS} FROM user_answers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_event(
    pool: &PgPool,
    event_id: &str,
) -> Result<Vec<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "SELECT {COLUMNS} FROM user_answers WHERE event_id = $1 ORDER BY user_id, created_at"
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "SELECT {COLUMNS} FROM user_answers WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn set_valid(
    pool: &PgPool,
    id: &str,
    valid: Option<bool>,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "UPDATE user_answers SET valid = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(valid)
    .bind(updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}
