use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::events::load_event;
use crate::api::guards::{CurrentProfessor, CurrentUser};
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user_answer::{
    SubmittedAnswers, UserAnswerResponse, UserAnswerSubmit, UserAnswerValidity,
};
use crate::services::answer_submission::{self, Submission, SubmissionError, SubmissionOutcome};
use crate::services::permissions::{authorize, Check, Rank};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/me", get(list_my_answers)).route("/:user_answer_id", put(grade_answer))
}

/// `POST /questions/:question_id/user-answers`
pub(crate) async fn submit_answer(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(payload): JsonBody<UserAnswerSubmit>,
) -> Result<(StatusCode, Json<SubmittedAnswers>), ApiError> {
    validate_payload(&payload)?;
    let submission =
        Submission::from_parts(payload.answer, payload.answers).map_err(SubmissionError::from)?;

    let outcome = answer_submission::submit(
        state.db(),
        current.id(),
        &question_id,
        submission,
        primitive_now_utc(),
    )
    .await?;
    metrics::record_submission(outcome.len());

    let body = match outcome {
        SubmissionOutcome::Single(answer) => {
            SubmittedAnswers::Single(UserAnswerResponse::from_db(answer))
        }
        SubmissionOutcome::Batch(answers) => SubmittedAnswers::Batch(
            answers.into_iter().map(UserAnswerResponse::from_db).collect(),
        ),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

async fn list_my_answers(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserAnswerResponse>>, ApiError> {
    let answers = repositories::user_answers::list_for_user(state.db(), current.id())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list user answers"))?;
    Ok(Json(answers.into_iter().map(UserAnswerResponse::from_db).collect()))
}

/// Graders set `valid` on answers of events they own or collaborate on.
/// Answers detached from any event are left to administrators.
async fn grade_answer(
    Path(user_answer_id): Path<String>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
    JsonBody(payload): JsonBody<UserAnswerValidity>,
) -> Result<Json<UserAnswerResponse>, ApiError> {
    let answer = repositories::user_answers::find_by_id(state.db(), &user_answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user answer"))?
        .ok_or(ApiError::NotFound("UserAnswer"))?;

    match answer.event_id.as_deref() {
        Some(event_id) => {
            let (_, possession) = load_event(&state, event_id).await?;
            authorize(
                &state.ladder(),
                &current.caller,
                &[Check::Rank(Rank::Professor)],
                &[Check::Possession(&possession)],
            )?;
        }
        None => current.require(&state, Rank::Admin)?,
    }

    let updated = repositories::user_answers::set_valid(
        state.db(),
        &answer.id,
        payload.valid,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grade user answer"))?
    .ok_or(ApiError::NotFound("UserAnswer"))?;

    tracing::info!(
        action = "user_answer_grade",
        user_answer_id = %updated.id,
        valid = ?updated.valid,
        "User answer graded"
    );
    Ok(Json(UserAnswerResponse::from_db(updated)))
}

#[cfg(test)]
mod tests;
