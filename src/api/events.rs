use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentProfessor, CurrentUser};
use crate::api::quizzes::{load_quiz, require_professor_collaborator};
use crate::api::validation::{JsonBody, QueryParams};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Event;
use crate::repositories;
use crate::schemas::event::{CurrentEventQuery, EventCreate, EventResponse, EventWarnResponse};
use crate::schemas::user::UserResponse;
use crate::schemas::user_answer::UserAnswerResponse;
use crate::schemas::Ack;
use crate::services::event_activity;
use crate::services::event_overlap::{self, NewEvent, Window};
use crate::services::permissions::{authorize, Check, Possession, Rank};
use crate::services::presence::{self, ServerMessage};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/current", get(current_event))
        .route("/start", post(start_event))
        .route("/:event_id", get(get_event).delete(delete_event))
        .route(
            "/:event_id/collaborators/:user_id",
            post(add_collaborator).delete(remove_collaborator),
        )
        .route("/:event_id/warns", get(list_warns))
        .route("/:event_id/user-answers", get(list_event_user_answers))
}

async fn create_event(
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
    JsonBody(payload): JsonBody<EventCreate>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    // The caller must own or collaborate on the quiz.
    let (_, quiz_possession) = load_quiz(&state, &payload.quiz_id).await?;
    authorize(
        &state.ladder(),
        &current.caller,
        &[Check::Rank(Rank::Professor)],
        &[Check::Possession(&quiz_possession)],
    )?;

    let now = primitive_now_utc();
    let event = event_overlap::schedule(
        state.db(),
        NewEvent {
            owner_id: current.id(),
            group_id: &payload.group_id,
            quiz_id: &payload.quiz_id,
            window: Window::new(payload.start, payload.end),
            countdown: payload.countdown,
        },
        now,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from_db(event, now))))
}

async fn list_events(
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let events = if current.has_rank(&state, Rank::Admin) {
        repositories::events::list_all(state.db()).await
    } else {
        repositories::events::list_possessed(state.db(), current.id()).await
    }
    .map_err(|e| ApiError::internal(e, "Failed to list events"))?;

    let now = primitive_now_utc();
    Ok(Json(events.into_iter().map(|event| EventResponse::from_db(event, now)).collect()))
}

/// Active event for the caller, or the next upcoming one unless
/// `onlyActual` is set.
async fn current_event(
    State(state): State<AppState>,
    current: CurrentUser,
    QueryParams(query): QueryParams<CurrentEventQuery>,
) -> Result<Json<EventResponse>, ApiError> {
    let now = primitive_now_utc();
    let event = event_activity::resolve_for_user(
        state.db(),
        current.id(),
        current.has_rank(&state, Rank::Professor),
        now,
        query.only_actual,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to resolve current event"))?
    .ok_or(ApiError::NotFound("Event"))?;

    Ok(Json(EventResponse::from_db(event, now)))
}

/// Starts the caller's current event. A no-op answers `null`.
async fn start_event(
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Option<EventResponse>>, ApiError> {
    let started = trigger_start(&state, current.id())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start event"))?;
    Ok(Json(started))
}

/// Flips the start flag of the professor's current event and pushes
/// `event:start` to everyone in its room.
pub(crate) async fn trigger_start(
    state: &AppState,
    professor_id: &str,
) -> Result<Option<EventResponse>, sqlx::Error> {
    let now = primitive_now_utc();
    let Some(event) = event_activity::start_for_professor(state.db(), professor_id, now).await?
    else {
        return Ok(None);
    };

    metrics::record_event_started();
    let room = presence::event_room(&event.id);
    let response = EventResponse::from_db(event, now);
    let delivered = state.presence().broadcast(&room, &ServerMessage::EventStart(response.clone()));
    tracing::debug!(room = %room, delivered, "event:start broadcast");
    Ok(Some(response))
}

async fn get_event(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<EventResponse>, ApiError> {
    let (event, possession) = load_event(&state, &event_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    let collaborators = repositories::events::list_collaborators(state.db(), &event.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list event collaborators"))?;

    Ok(Json(
        EventResponse::from_db(event, primitive_now_utc())
            .with_collaborators(collaborators.into_iter().map(UserResponse::from_db).collect()),
    ))
}

async fn delete_event(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_event(&state, &event_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Ownership(&possession)])?;

    repositories::events::delete(state.db(), &event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete event"))?;

    tracing::info!(action = "event_delete", event_id = %event_id, "Event deleted");
    Ok(Json(Ack::Deleted))
}

async fn add_collaborator(
    Path((event_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_event(&state, &event_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Ownership(&possession)])?;
    require_professor_collaborator(&state, &user_id).await?;

    let added = repositories::events::add_collaborator(state.db(), &event_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to add event collaborator"))?;
    if !added {
        return Err(ApiError::Duplication("Collaborator"));
    }

    tracing::info!(
        action = "event_collaborator_add",
        event_id = %event_id,
        user_id = %user_id,
        "Collaborator added"
    );
    Ok(Json(Ack::Added))
}

async fn remove_collaborator(
    Path((event_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_event(&state, &event_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Ownership(&possession)])?;

    let removed = repositories::events::remove_collaborator(state.db(), &event_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove event collaborator"))?;
    if !removed {
        return Err(ApiError::NotFound("Collaborator"));
    }
    Ok(Json(Ack::Removed))
}

async fn list_warns(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<EventWarnResponse>>, ApiError> {
    let (_, possession) = load_event(&state, &event_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    let warns = repositories::event_warns::list_for_event(state.db(), &event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list event warnings"))?;
    Ok(Json(warns.into_iter().map(EventWarnResponse::from_db).collect()))
}

async fn list_event_user_answers(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserAnswerResponse>>, ApiError> {
    let (_, possession) = load_event(&state, &event_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    let answers = repositories::user_answers::list_for_event(state.db(), &event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list user answers"))?;
    Ok(Json(answers.into_iter().map(UserAnswerResponse::from_db).collect()))
}

pub(crate) async fn load_event(
    state: &AppState,
    event_id: &str,
) -> Result<(Event, Possession), ApiError> {
    let event = repositories::events::find_by_id(state.db(), event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch event"))?
        .ok_or(ApiError::NotFound("Event"))?;
    let collaborator_ids = repositories::events::collaborator_ids(state.db(), event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch event collaborators"))?;
    let possession = Possession::new(event.owner_id.clone(), collaborator_ids);
    Ok((event, possession))
}

#[cfg(test)]
mod tests;
