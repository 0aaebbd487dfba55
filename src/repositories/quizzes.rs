use sqlx::PgPool;

use crate::db::models::{Question, Quiz, User};

const COLUMNS: &str =
    "id, slug, title, description, strict, shuffle, owner_id, created_at, updated_at";

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) strict: bool,
    pub(crate) shuffle: bool,
    pub(crate) owner_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateQuiz {
    pub(crate) slug: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) strict: Option<bool>,
    pub(crate) shuffle: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, slug, title, description, strict, shuffle, owner_id, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.slug)
    .bind(params.title)
    .bind(params.description)
    .bind(params.strict)
    .bind(params.shuffle)
    .bind(params.owner_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await
}

/// Quizzes the user owns or collaborates on.
pub(crate) async fn list_possessed(pool: &PgPool, user_id: &str) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes q
         WHERE q.owner_id = $1
            OR EXISTS (
                SELECT 1 FROM quiz_collaborators qc WHERE qc.quiz_id = q.id AND qc.user_id = $1
            )
         ORDER BY q.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuiz,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            slug = COALESCE($1, slug),
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            strict = COALESCE($4, strict),
            shuffle = COALESCE($5, shuffle),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.slug)
    .bind(params.title)
    .bind(params.description)
    .bind(params.strict)
    .bind(params.shuffle)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn collaborator_ids(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM quiz_collaborators WHERE quiz_id = $1 ORDER BY user_id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_collaborators(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.hashed_password, u.gender,
                u.role_id, u.created_at, u.updated_at
         FROM users u JOIN quiz_collaborators qc ON qc.user_id = u.id
         WHERE qc.quiz_id = $1
         ORDER BY u.username",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn add_collaborator(
    pool: &PgPool,
    quiz_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO quiz_collaborators (quiz_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(quiz_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_collaborator(
    pool: &PgPool,
    quiz_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_collaborators WHERE quiz_id = $1 AND user_id = $2")
        .bind(quiz_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn add_question(
    pool: &PgPool,
    quiz_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO quiz_questions (quiz_id, question_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(quiz_id)
    .bind(question_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_question(
    pool: &PgPool,
    quiz_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = $1 AND question_id = $2")
            .bind(quiz_id)
            .bind(question_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn has_question(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM quiz_questions WHERE quiz_id = $1 AND question_id = $2)",
    )
    .bind(quiz_id)
    .bind(question_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "SELECT q.id, q.slug, q.title, q.description, q.question_type, q.typed_question_id,
                q.created_at, q.updated_at
         FROM questions q JOIN quiz_questions qq ON qq.question_id = q.id
         WHERE qq.quiz_id = $1
         ORDER BY q.created_at",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}
