use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentProfessor, CurrentUser};
use crate::api::user_answers;
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::db::types::QuestionType;
use crate::repositories;
use crate::repositories::questions::NewTypedQuestion;
use crate::schemas::answer::AnswerResponse;
use crate::schemas::question::{
    ChoiceCreate, ChoiceResponse, ChoiceUpdate, QuestionCreate, QuestionResponse, QuestionUpdate,
};
use crate::schemas::Ack;
use crate::services::event_activity::{self, Scope};
use crate::services::permissions::Rank;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route("/:question_id", get(get_question).put(update_question).delete(delete_question))
        .route("/:question_id/choices", post(create_choice))
        .route("/:question_id/answers", get(list_question_answers))
        .route("/:question_id/user-answers", post(user_answers::submit_answer))
        .route(
            "/:question_id/answers/:answer_id",
            post(attach_answer).delete(detach_answer),
        )
}

pub(crate) fn choices_router() -> Router<AppState> {
    Router::new().route("/:choice_id", put(update_choice).delete(delete_choice))
}

async fn list_questions(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let questions = repositories::questions::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;

    let mut responses = Vec::with_capacity(questions.len());
    for question in questions {
        let typed = repositories::questions::find_typed_by_id(state.db(), &question.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load question"))?;
        if let Some((question, typed)) = typed {
            responses.push(QuestionResponse::from_db(question, typed, true));
        }
    }
    Ok(Json(responses))
}

async fn create_question(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    validate_payload(&payload)?;

    let typed = payload.typed_question.into_new(payload.question_type);
    ensure_specification(&state, &typed).await?;

    let now = primitive_now_utc();
    let (question, typed) = repositories::questions::create(
        state.db(),
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            title: &payload.title,
            description: &payload.description,
            typed_id: &Uuid::new_v4().to_string(),
            typed,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Question", "Failed to create question"))?;

    tracing::info!(action = "question_create", question_id = %question.id, "Question created");
    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, typed, true))))
}

/// Professors see every question. Anyone else only sees questions of the
/// quiz behind their active event, without choice validity.
async fn get_question(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<QuestionResponse>, ApiError> {
    let (question, typed) = repositories::questions::find_typed_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question"))?
        .ok_or(ApiError::NotFound("Question"))?;

    if current.has_rank(&state, Rank::Professor) {
        return Ok(Json(QuestionResponse::from_db(question, typed, true)));
    }

    let group_ids = repositories::users::group_ids(state.db(), current.id())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user groups"))?;
    let event = event_activity::resolve_for(
        state.db(),
        Scope::Groups(&group_ids),
        primitive_now_utc(),
        true,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to resolve event"))?
    .ok_or(ApiError::NotFound("Event"))?;

    let in_quiz = repositories::quizzes::has_question(state.db(), &event.quiz_id, &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check quiz question"))?;
    if !in_quiz {
        return Err(ApiError::NotFound("Question"));
    }

    Ok(Json(QuestionResponse::from_db(question, typed, false)))
}

async fn update_question(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    validate_payload(&payload)?;
    let question = load_question(&state, &question_id).await?;

    let typed = payload.typed_question.map(|typed| typed.into_new(question.question_type));
    if let Some(typed) = typed.as_ref() {
        ensure_specification(&state, typed).await?;
    }

    let (question, typed) = repositories::questions::update(
        state.db(),
        &question,
        repositories::questions::UpdateQuestion {
            slug: payload.slug,
            title: payload.title,
            description: payload.description,
            typed,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Question", "Failed to update question"))?;

    Ok(Json(QuestionResponse::from_db(question, typed, true)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let question = load_question(&state, &question_id).await?;
    repositories::questions::delete(state.db(), &question)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    tracing::info!(action = "question_delete", question_id = %question_id, "Question deleted");
    Ok(Json(Ack::Deleted))
}

async fn create_choice(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<ChoiceCreate>,
) -> Result<(StatusCode, Json<ChoiceResponse>), ApiError> {
    validate_payload(&payload)?;
    let question = load_question(&state, &question_id).await?;
    if question.question_type != QuestionType::ChoiceQuestion {
        return Err(ApiError::InvalidInput("Choices belong to choice questions only".to_string()));
    }

    let now = primitive_now_utc();
    let choice = repositories::questions::create_choice(
        state.db(),
        repositories::questions::CreateChoice {
            id: &Uuid::new_v4().to_string(),
            choice_question_id: &question.typed_question_id,
            slug: &payload.slug,
            name: &payload.name,
            valid: payload.valid,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Choice", "Failed to create choice"))?;

    Ok((StatusCode::CREATED, Json(ChoiceResponse::from_db(choice, true))))
}

async fn update_choice(
    Path(choice_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<ChoiceUpdate>,
) -> Result<Json<ChoiceResponse>, ApiError> {
    validate_payload(&payload)?;

    let choice = repositories::questions::update_choice(
        state.db(),
        &choice_id,
        repositories::questions::UpdateChoice {
            slug: payload.slug,
            name: payload.name,
            valid: payload.valid,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Choice", "Failed to update choice"))?
    .ok_or(ApiError::NotFound("Choice"))?;

    Ok(Json(ChoiceResponse::from_db(choice, true)))
}

async fn delete_choice(
    Path(choice_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let deleted = repositories::questions::delete_choice(state.db(), &choice_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete choice"))?;
    if !deleted {
        return Err(ApiError::NotFound("Choice"));
    }
    Ok(Json(Ack::Deleted))
}

async fn list_question_answers(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<AnswerResponse>>, ApiError> {
    load_question(&state, &question_id).await?;
    let answers = repositories::questions::list_answers(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list question answers"))?;

    let mut responses = Vec::with_capacity(answers.len());
    for answer in answers {
        let typed = repositories::answers::find_typed_by_id(state.db(), &answer.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load answer"))?;
        if let Some((answer, typed)) = typed {
            responses.push(AnswerResponse::from_db(answer, typed));
        }
    }
    Ok(Json(responses))
}

async fn attach_answer(
    Path((question_id, answer_id)): Path<(String, String)>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    load_question(&state, &question_id).await?;
    repositories::answers::find_by_id(state.db(), &answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer"))?
        .ok_or(ApiError::NotFound("Answer"))?;

    let added = repositories::questions::add_answer(state.db(), &question_id, &answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to attach answer"))?;
    if !added {
        return Err(ApiError::Duplication("Question answer"));
    }
    Ok(Json(Ack::Added))
}

async fn detach_answer(
    Path((question_id, answer_id)): Path<(String, String)>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let removed = repositories::questions::remove_answer(state.db(), &question_id, &answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to detach answer"))?;
    if !removed {
        return Err(ApiError::NotFound("Question answer"));
    }
    Ok(Json(Ack::Removed))
}

async fn load_question(state: &AppState, question_id: &str) -> Result<Question, ApiError> {
    repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or(ApiError::NotFound("Question"))
}

async fn ensure_specification(state: &AppState, typed: &NewTypedQuestion) -> Result<(), ApiError> {
    let specification_id = match typed {
        NewTypedQuestion::Numeric { specification_id }
        | NewTypedQuestion::Choice { specification_id, .. } => specification_id.as_deref(),
        NewTypedQuestion::Textual { .. } => None,
    };
    let Some(specification_id) = specification_id else {
        return Ok(());
    };

    repositories::specifications::find_by_id(state.db(), specification_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch specification"))?
        .ok_or(ApiError::NotFound("Specification"))?;
    Ok(())
}
