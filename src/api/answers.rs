use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentProfessor;
use crate::api::validation::JsonBody;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Answer;
use crate::repositories;
use crate::repositories::answers::NewTypedAnswer;
use crate::schemas::answer::{AnswerCreate, AnswerResponse, AnswerUpdate};
use crate::schemas::Ack;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_answers).post(create_answer))
        .route("/:answer_id", get(get_answer).put(update_answer).delete(delete_answer))
}

async fn list_answers(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Vec<AnswerResponse>>, ApiError> {
    let answers = repositories::answers::list_typed(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list answers"))?;
    Ok(Json(
        answers.into_iter().map(|(answer, typed)| AnswerResponse::from_db(answer, typed)).collect(),
    ))
}

async fn create_answer(
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<AnswerCreate>,
) -> Result<(StatusCode, Json<AnswerResponse>), ApiError> {
    let typed = payload.typed_answer.into_new(payload.answer_type).map_err(ApiError::InvalidInput)?;
    ensure_exact_content_free(&state, &typed, None).await?;

    let now = primitive_now_utc();
    let (answer, typed) = repositories::answers::create(
        state.db(),
        repositories::answers::CreateAnswer {
            id: &Uuid::new_v4().to_string(),
            typed_id: &Uuid::new_v4().to_string(),
            typed,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Answer", "Failed to create answer"))?;

    Ok((StatusCode::CREATED, Json(AnswerResponse::from_db(answer, typed))))
}

async fn get_answer(
    Path(answer_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<AnswerResponse>, ApiError> {
    let (answer, typed) = repositories::answers::find_typed_by_id(state.db(), &answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answer"))?
        .ok_or(ApiError::NotFound("Answer"))?;
    Ok(Json(AnswerResponse::from_db(answer, typed)))
}

async fn update_answer(
    Path(answer_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
    JsonBody(payload): JsonBody<AnswerUpdate>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let answer = load_answer(&state, &answer_id).await?;
    let typed = payload.typed_answer.into_new(answer.answer_type).map_err(ApiError::InvalidInput)?;
    ensure_exact_content_free(&state, &typed, Some(&answer.typed_answer_id)).await?;

    let (answer, typed) =
        repositories::answers::update_typed(state.db(), &answer, typed, primitive_now_utc())
            .await
            .map_err(|e| ApiError::from_write(e, "Answer", "Failed to update answer"))?;

    Ok(Json(AnswerResponse::from_db(answer, typed)))
}

async fn delete_answer(
    Path(answer_id): Path<String>,
    State(state): State<AppState>,
    _professor: CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let answer = load_answer(&state, &answer_id).await?;
    repositories::answers::delete(state.db(), &answer)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete answer"))?;
    Ok(Json(Ack::Deleted))
}

async fn load_answer(state: &AppState, answer_id: &str) -> Result<Answer, ApiError> {
    repositories::answers::find_by_id(state.db(), answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer"))?
        .ok_or(ApiError::NotFound("Answer"))
}

/// Exact answer contents are unique across the catalog.
async fn ensure_exact_content_free(
    state: &AppState,
    typed: &NewTypedAnswer,
    except_typed_id: Option<&str>,
) -> Result<(), ApiError> {
    let NewTypedAnswer::Exact { answer_content } = typed else {
        return Ok(());
    };
    let taken =
        repositories::answers::exact_content_taken(state.db(), answer_content, except_typed_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check answer content"))?;
    if taken {
        Err(ApiError::Duplication("Answer"))
    } else {
        Ok(())
    }
}
