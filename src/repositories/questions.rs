use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::{
    Answer, Choice, ChoiceQuestion, NumericQuestion, Question, TextualQuestion, TypedQuestion,
};
use crate::db::types::{QuestionType, VerificationType};

const COLUMNS: &str =
    "id, slug, title, description, question_type, typed_question_id, created_at, updated_at";
const CHOICE_COLUMNS: &str =
    "id, choice_question_id, slug, name, valid, created_at, updated_at";

/// Subtype payload for a new question or a replacement of an existing one.
#[derive(Debug, Clone)]
pub(crate) enum NewTypedQuestion {
    Textual { case_sensitive: bool, accent_sensitive: bool, verification_type: VerificationType },
    Numeric { specification_id: Option<String> },
    Choice { shuffle: bool, specification_id: Option<String> },
}

impl NewTypedQuestion {
    pub(crate) fn question_type(&self) -> QuestionType {
        match self {
            NewTypedQuestion::Textual { .. } => QuestionType::TextualQuestion,
            NewTypedQuestion::Numeric { .. } => QuestionType::NumericQuestion,
            NewTypedQuestion::Choice { .. } => QuestionType::ChoiceQuestion,
        }
    }
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) typed_id: &'a str,
    pub(crate) typed: NewTypedQuestion,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateQuestion {
    pub(crate) slug: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) typed: Option<NewTypedQuestion>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<(Question, TypedQuestion), sqlx::Error> {
    let mut tx = pool.begin().await?;

    write_typed(&mut tx, params.typed_id, &params.typed, true).await?;
    let question = sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, slug, title, description, question_type, typed_question_id, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.slug)
    .bind(params.title)
    .bind(params.description)
    .bind(params.typed.question_type())
    .bind(params.typed_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(&mut *tx)
    .await?;

    let typed = load_typed(&mut tx, &question).await?.ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;
    Ok((question, typed))
}

/// Inserts or rewrites the subtype row. The choices of a choice question are
/// left untouched on rewrite.
async fn write_typed(
    tx: &mut Transaction<'_, Postgres>,
    typed_id: &str,
    typed: &NewTypedQuestion,
    insert: bool,
) -> Result<(), sqlx::Error> {
    let query = match (typed, insert) {
        (
            NewTypedQuestion::Textual { case_sensitive, accent_sensitive, verification_type },
            true,
        ) => {
            sqlx::query(
                "INSERT INTO textual_questions
                    (id, case_sensitive, accent_sensitive, verification_type)
                 VALUES ($1,$2,$3,$4)",
            )
            .bind(typed_id)
            .bind(*case_sensitive)
            .bind(*accent_sensitive)
            .bind(*verification_type)
        }
        (
            NewTypedQuestion::Textual { case_sensitive, accent_sensitive, verification_type },
            false,
        ) => {
            sqlx::query(
                "UPDATE textual_questions
                 SET case_sensitive = $2, accent_sensitive = $3, verification_type = $4
                 WHERE id = $1",
            )
            .bind(typed_id)
            .bind(*case_sensitive)
            .bind(*accent_sensitive)
            .bind(*verification_type)
        }
        (NewTypedQuestion::Numeric { specification_id }, true) => {
            sqlx::query("INSERT INTO numeric_questions (id, specification_id) VALUES ($1,$2)")
                .bind(typed_id)
                .bind(specification_id.clone())
        }
        (NewTypedQuestion::Numeric { specification_id }, false) => {
            sqlx::query("UPDATE numeric_questions SET specification_id = $2 WHERE id = $1")
                .bind(typed_id)
                .bind(specification_id.clone())
        }
        (NewTypedQuestion::Choice { shuffle, specification_id }, true) => sqlx::query(
            "INSERT INTO choice_questions (id, shuffle, specification_id) VALUES ($1,$2,$3)",
        )
        .bind(typed_id)
        .bind(*shuffle)
        .bind(specification_id.clone()),
        (NewTypedQuestion::Choice { shuffle, specification_id }, false) => sqlx::query(
            "UPDATE choice_questions SET shuffle = $2, specification_id = $3 WHERE id = $1",
        )
        .bind(typed_id)
        .bind(*shuffle)
        .bind(specification_id.clone()),
    };
    query.execute(&mut **tx).await?;
    Ok(())
}

/// Resolves the subtype row a question points at through its discriminator.
pub(crate) async fn load_typed(
    conn: &mut sqlx::PgConnection,
    question: &Question,
) -> Result<Option<TypedQuestion>, sqlx::Error> {
    let id = question.typed_question_id.as_str();
    let typed = match question.question_type {
        QuestionType::TextualQuestion => sqlx::query_as::<_, TextualQuestion>(
            "SELECT id, case_sensitive, accent_sensitive, verification_type
             FROM textual_questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(TypedQuestion::Textual),
        QuestionType::NumericQuestion => sqlx::query_as::<_, NumericQuestion>(
            "SELECT id, specification_id FROM numeric_questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(TypedQuestion::Numeric),
        QuestionType::ChoiceQuestion => {
            let question = sqlx::query_as::<_, ChoiceQuestion>(
                "SELECT id, shuffle, specification_id FROM choice_questions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            match question {
                Some(question) => {
                    let choices = list_choices(&mut *conn, &question.id).await?;
                    Some(TypedQuestion::Choice { question, choices })
                }
                None => None,
            }
        }
    };
    Ok(typed)
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_typed_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<(Question, TypedQuestion)>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let Some(question) = find_by_id(&mut *conn, id).await? else {
        return Ok(None);
    };
    let typed = load_typed(&mut conn, &question).await?;
    Ok(typed.map(|typed| (question, typed)))
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    question: &Question,
    params: UpdateQuestion,
) -> Result<(Question, TypedQuestion), sqlx::Error> {
    let mut tx = pool.begin().await?;

    if let Some(typed) = &params.typed {
        write_typed(&mut tx, &question.typed_question_id, typed, false).await?;
    }

    let updated = sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            slug = COALESCE($1, slug),
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.slug)
    .bind(params.title)
    .bind(params.description)
    .bind(params.updated_at)
    .bind(&question.id)
    .fetch_one(&mut *tx)
    .await?;

    let typed = load_typed(&mut tx, &updated).await?.ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;
    Ok((updated, typed))
}

pub(crate) async fn delete(pool: &PgPool, question: &Question) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(&question.id)
        .execute(&mut *tx)
        .await?;

    let typed_table = match question.question_type {
        QuestionType::TextualQuestion => "textual_questions",
        QuestionType::NumericQuestion => "numeric_questions",
        QuestionType::ChoiceQuestion => "choice_questions",
    };
    sqlx::query(&format!("DELETE FROM {typed_table} WHERE id = $1"))
        .bind(&question.typed_question_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

pub(crate) async fn list_choices(
    executor: impl sqlx::PgExecutor<'_>,
    choice_question_id: &str,
) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "SELECT {CHOICE_COLUMNS} FROM choices WHERE choice_question_id = $1 ORDER BY slug"
    ))
    .bind(choice_question_id)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateChoice<'a> {
    pub(crate) id: &'a str,
    pub(crate) choice_question_id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) name: &'a str,
    pub(crate) valid: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateChoice {
    pub(crate) slug: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) valid: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create_choice(
    pool: &PgPool,
    params: CreateChoice<'_>,
) -> Result<Choice, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "INSERT INTO choices (id, choice_question_id, slug, name, valid, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {CHOICE_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.choice_question_id)
    .bind(params.slug)
    .bind(params.name)
    .bind(params.valid)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_choice(pool: &PgPool, id: &str) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!("SELECT {CHOICE_COLUMNS} FROM choices WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The question owning a choice, through its choice subtype row.
pub(crate) async fn find_by_choice(
    pool: &PgPool,
    choice: &Choice,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions
         WHERE question_type = $1 AND typed_question_id = $2"
    ))
    .bind(QuestionType::ChoiceQuestion)
    .bind(&choice.choice_question_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn update_choice(
    pool: &PgPool,
    id: &str,
    params: UpdateChoice,
) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "UPDATE choices SET
            slug = COALESCE($1, slug),
            name = COALESCE($2, name),
            valid = COALESCE($3, valid),
            updated_at = $4
         WHERE id = $5
         RETURNING {CHOICE_COLUMNS}",
    ))
    .bind(params.slug)
    .bind(params.name)
    .bind(params.valid)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_choice(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM choices WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn add_answer(
    pool: &PgPool,
    question_id: &str,
    answer_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO question_answers (question_id, answer_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(question_id)
    .bind(answer_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_answer(
    pool: &PgPool,
    question_id: &str,
    answer_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM question_answers WHERE question_id = $1 AND answer_id = $2")
            .bind(question_id)
            .bind(answer_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_answers(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(
        "SELECT a.id, a.answer_type, a.typed_answer_id, a.created_at, a.updated_at
         FROM answers a JOIN question_answers qa ON qa.answer_id = a.id
         WHERE qa.question_id = $1
         ORDER BY a.created_at",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
}
