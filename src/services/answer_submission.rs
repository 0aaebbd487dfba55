//! Student answer submission.
//!
//! Checks run in a fixed order and stop at the first failure: payload shape,
//! user, group membership, active event, question membership in the event's
//! quiz, prior answer, warning gate. All rows of one submission are written
//! in a single transaction holding a lock keyed by (user, question).

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db;
use crate::db::models::UserAnswer;
use crate::repositories;
use crate::services::event_activity::{self, Scope};
use crate::services::warnings::{self, WarningBlock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Submission {
    Single(String),
    Batch(Vec<String>),
}

impl Submission {
    /// Exactly one of `answer` and a non-empty `answers` must be present.
    pub(crate) fn from_parts(
        answer: Option<String>,
        answers: Option<Vec<String>>,
    ) -> Result<Self, SubmissionRejection> {
        match (answer, answers) {
            (Some(_), Some(_)) => Err(SubmissionRejection::InvalidPayload(
                "\"answer\" and \"answers\" are mutually exclusive",
            )),
            (None, None) => Err(SubmissionRejection::InvalidPayload(
                "either \"answer\" or \"answers\" is required",
            )),
            (Some(answer), None) => Ok(Submission::Single(answer)),
            (None, Some(answers)) if answers.is_empty() => Err(
                SubmissionRejection::InvalidPayload("\"answers\" must contain at least 1 item"),
            ),
            (None, Some(answers)) => Ok(Submission::Batch(answers)),
        }
    }

    pub(crate) fn contents(&self) -> &[String] {
        match self {
            Submission::Single(answer) => std::slice::from_ref(answer),
            Submission::Batch(answers) => answers,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SubmissionRejection {
    #[error("{0}")]
    InvalidPayload(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("Event not found")]
    EventNotFound,
    #[error("Question not found")]
    QuestionNotFound,
    #[error("UserAnswer already exists")]
    AlreadyAnswered,
    #[error(transparent)]
    Warning(#[from] WarningBlock),
}

#[derive(Debug, Error)]
pub(crate) enum SubmissionError {
    #[error(transparent)]
    Rejected(#[from] SubmissionRejection),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub(crate) enum SubmissionOutcome {
    Single(UserAnswer),
    Batch(Vec<UserAnswer>),
}

impl SubmissionOutcome {
    pub(crate) fn len(&self) -> usize {
        match self {
            SubmissionOutcome::Single(_) => 1,
            SubmissionOutcome::Batch(answers) => answers.len(),
        }
    }
}

pub(crate) fn lock_key(user_id: &str, question_id: &str) -> String {
    format!("user-answer:{user_id}:{question_id}")
}

pub(crate) async fn submit(
    pool: &PgPool,
    user_id: &str,
    question_id: &str,
    submission: Submission,
    now: time::PrimitiveDateTime,
) -> Result<SubmissionOutcome, SubmissionError> {
    if !repositories::users::exists(pool, user_id).await? {
        return Err(SubmissionRejection::UserNotFound.into());
    }

    let group_ids = repositories::users::group_ids(pool, user_id).await?;
    if group_ids.is_empty() {
        return Err(SubmissionRejection::EventNotFound.into());
    }

    let event = event_activity::resolve_for(pool, Scope::Groups(&group_ids), now, true)
        .await?
        .ok_or(SubmissionRejection::EventNotFound)?;

    if repositories::questions::find_by_id(pool, question_id).await?.is_none()
        || !repositories::quizzes::has_question(pool, &event.quiz_id, question_id).await?
    {
        return Err(SubmissionRejection::QuestionNotFound.into());
    }

    let mut tx = pool.begin().await?;
    db::advisory_xact_lock(&mut tx, &lock_key(user_id, question_id)).await?;

    if repositories::user_answers::exists_for(&mut *tx, user_id, question_id).await? {
        return Err(SubmissionRejection::AlreadyAnswered.into());
    }

    let strict = repositories::quizzes::find_by_id(&mut *tx, &event.quiz_id)
        .await?
        .map(|quiz| quiz.strict)
        .unwrap_or(false);
    let amount = repositories::event_warns::find_amount(&mut *tx, &event.id, user_id).await?;
    warnings::check_submission(amount, strict).map_err(SubmissionRejection::from)?;

    let mut created = Vec::with_capacity(submission.contents().len());
    for content in submission.contents() {
        let row = repositories::user_answers::create(
            &mut *tx,
            repositories::user_answers::CreateUserAnswer {
                id: &Uuid::new_v4().to_string(),
                answer_content: content,
                user_id,
                question_id,
                event_id: Some(&event.id),
                created_at: now,
                updated_at: now,
            },
        )
        .await?;
        created.push(row);
    }
    tx.commit().await?;

    tracing::info!(
        action = "user_answer_submit",
        user_id,
        question_id,
        event_id = %event.id,
        count = created.len(),
        "Answers submitted"
    );

    Ok(match submission {
        Submission::Single(_) => match created.pop() {
            Some(answer) => SubmissionOutcome::Single(answer),
            None => SubmissionOutcome::Batch(Vec::new()),
        },
        Submission::Batch(_) => SubmissionOutcome::Batch(created),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_answer_payload() {
        let submission = Submission::from_parts(Some("42".into()), None).expect("single");
        assert_eq!(submission, Submission::Single("42".into()));
        assert_eq!(submission.contents(), ["42".to_string()]);
    }

    #[test]
    fn batch_payload_keeps_order() {
        let submission =
            Submission::from_parts(None, Some(vec!["a".into(), "b".into()])).expect("batch");
        assert_eq!(submission.contents(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn both_fields_are_rejected() {
        let result = Submission::from_parts(Some("a".into()), Some(vec!["b".into()]));
        assert!(matches!(result, Err(SubmissionRejection::InvalidPayload(_))));
    }

    #[test]
    fn missing_and_empty_payloads_are_rejected() {
        assert!(matches!(
            Submission::from_parts(None, None),
            Err(SubmissionRejection::InvalidPayload(_))
        ));
        assert!(matches!(
            Submission::from_parts(None, Some(Vec::new())),
            Err(SubmissionRejection::InvalidPayload(_))
        ));
    }

    #[test]
    fn lock_key_is_per_user_and_question() {
        assert_ne!(lock_key("u1", "q1"), lock_key("u1", "q2"));
        assert_ne!(lock_key("u1", "q1"), lock_key("u2", "q1"));
    }

    #[test]
    fn warning_block_converts_into_rejection() {
        let rejection: SubmissionRejection = WarningBlock::Submission.into();
        assert_eq!(rejection, SubmissionRejection::Warning(WarningBlock::Submission));
    }
}
