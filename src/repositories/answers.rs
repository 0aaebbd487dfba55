use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::{Answer, ComparisonAnswer, ExactAnswer, TypedAnswer};
use crate::db::types::AnswerType;

const COLUMNS: &str = "id, answer_type, typed_answer_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub(crate) enum NewTypedAnswer {
    Exact { answer_content: String },
    Comparison { greater_than: f64, lower_than: f64 },
}

impl NewTypedAnswer {
    pub(crate) fn answer_type(&self) -> AnswerType {
        match self {
            NewTypedAnswer::Exact { .. } => AnswerType::ExactAnswer,
            NewTypedAnswer::Comparison { .. } => AnswerType::ComparisonAnswer,
        }
    }
}

pub(crate) struct CreateAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) typed_id: &'a str,
    pub(crate) typed: NewTypedAnswer,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAnswer<'_>,
) -> Result<(Answer, TypedAnswer), sqlx::Error> {
    let mut tx = pool.begin().await?;

    write_typed(&mut tx, params.typed_id, &params.typed, true).await?;
    let answer = sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (id, answer_type, typed_answer_id, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.typed.answer_type())
    .bind(params.typed_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(&mut *tx)
    .await?;

    let typed = load_typed(&mut tx, &answer).await?.ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;
    Ok((answer, typed))
}

async fn write_typed(
    tx: &mut Transaction<'_, Postgres>,
    typed_id: &str,
    typed: &NewTypedAnswer,
    insert: bool,
) -> Result<(), sqlx::Error> {
    let query = match (typed, insert) {
        (NewTypedAnswer::Exact { answer_content }, true) => {
            sqlx::query("INSERT INTO exact_answers (id, answer_content) VALUES ($1, $2)")
                .bind(typed_id)
                .bind(answer_content.clone())
        }
        (NewTypedAnswer::Exact { answer_content }, false) => {
            sqlx::query("UPDATE exact_answers SET answer_content = $2 WHERE id = $1")
                .bind(typed_id)
                .bind(answer_content.clone())
        }
        (NewTypedAnswer::Comparison { greater_than, lower_than }, true) => sqlx::query(
            "INSERT INTO comparison_answers (id, greater_than, lower_than) VALUES ($1, $2, $3)",
        )
        .bind(typed_id)
        .bind(*greater_than)
        .bind(*lower_than),
        (NewTypedAnswer::Comparison { greater_than, lower_than }, false) => sqlx::query(
            "UPDATE comparison_answers SET greater_than = $2, lower_than = $3 WHERE id = $1",
        )
        .bind(typed_id)
        .bind(*greater_than)
        .bind(*lower_than),
    };
    query.execute(&mut **tx).await?;
    Ok(())
}

pub(crate) async fn load_typed(
    conn: &mut sqlx::PgConnection,
    answer: &Answer,
) -> Result<Option<TypedAnswer>, sqlx::Error> {
    let id = answer.typed_answer_id.as_str();
    let typed = match answer.answer_type {
        AnswerType::ExactAnswer => sqlx::query_as::<_, ExactAnswer>(
            "SELECT id, answer_content FROM exact_answers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(TypedAnswer::Exact),
        AnswerType::ComparisonAnswer => sqlx::query_as::<_, ComparisonAnswer>(
            "SELECT id, greater_than, lower_than FROM comparison_answers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(TypedAnswer::Comparison),
    };
    Ok(typed)
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!("SELECT {COLUMNS} FROM answers WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_typed_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<(Answer, TypedAnswer)>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let Some(answer) = find_by_id(&mut *conn, id).await? else {
        return Ok(None);
    };
    let typed = load_typed(&mut conn, &answer).await?;
    Ok(typed.map(|typed| (answer, typed)))
}

pub(crate) async fn list_typed(pool: &PgPool) -> Result<Vec<(Answer, TypedAnswer)>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let answers = sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers ORDER BY created_at DESC"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut typed_answers = Vec::with_capacity(answers.len());
    for answer in answers {
        if let Some(typed) = load_typed(&mut conn, &answer).await? {
            typed_answers.push((answer, typed));
        }
    }
    Ok(typed_answers)
}

pub(crate) async fn exact_content_taken(
    pool: &PgPool,
    content: &str,
    except_typed_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM exact_answers
            WHERE answer_content = $1 AND ($2::VARCHAR IS NULL OR id <> $2)
        )",
    )
    .bind(content)
    .bind(except_typed_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update_typed(
    pool: &PgPool,
    answer: &Answer,
    typed: NewTypedAnswer,
    updated_at: time::PrimitiveDateTime,
) -> Result<(Answer, TypedAnswer), sqlx::Error> {
    let mut tx = pool.begin().await?;
    write_typed(&mut tx, &answer.typed_answer_id, &typed, false).await?;

    let updated = sqlx::query_as::<_, Answer>(&format!(
        "UPDATE answers SET updated_at = $1 WHERE id = $2 RETURNING {COLUMNS}"
    ))
    .bind(updated_at)
    .bind(&answer.id)
    .fetch_one(&mut *tx)
    .await?;

    let typed = load_typed(&mut tx, &updated).await?.ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;
    Ok((updated, typed))
}

pub(crate) async fn delete(pool: &PgPool, answer: &Answer) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM answers WHERE id = $1").bind(&answer.id).execute(&mut *tx).await?;

    let typed_table = match answer.answer_type {
        AnswerType::ExactAnswer => "exact_answers",
        AnswerType::ComparisonAnswer => "comparison_answers",
    };
    sqlx::query(&format!("DELETE FROM {typed_table} WHERE id = $1"))
        .bind(&answer.typed_answer_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}
