use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentProfessor;
use crate::api::validation::{validate_payload, JsonBody};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Quiz;
use crate::repositories;
use crate::schemas::question::QuestionResponse;
use crate::schemas::quiz::{QuizCreate, QuizResponse, QuizUpdate};
use crate::schemas::user::UserResponse;
use crate::schemas::Ack;
use crate::services::permissions::{authorize, Check, Possession, Rank};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quizzes).post(create_quiz))
        .route("/:quiz_id", get(get_quiz).put(update_quiz).delete(delete_quiz))
        .route("/:quiz_id/questions", get(list_quiz_questions))
        .route("/:quiz_id/questions/:question_id", post(add_question).delete(remove_question))
        .route(
            "/:quiz_id/collaborators/:user_id",
            post(add_collaborator).delete(remove_collaborator),
        )
}

async fn list_quizzes(
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let quizzes = if current.has_rank(&state, Rank::Admin) {
        repositories::quizzes::list_all(state.db()).await
    } else {
        repositories::quizzes::list_possessed(state.db(), current.id()).await
    }
    .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(quizzes.into_iter().map(QuizResponse::from_db).collect()))
}

async fn create_quiz(
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
    JsonBody(payload): JsonBody<QuizCreate>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let quiz = repositories::quizzes::create(
        state.db(),
        repositories::quizzes::CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            title: &payload.title,
            description: &payload.description,
            strict: payload.strict,
            shuffle: payload.shuffle,
            owner_id: current.id(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Quiz", "Failed to create quiz"))?;

    tracing::info!(
        action = "quiz_create",
        quiz_id = %quiz.id,
        owner_id = %quiz.owner_id,
        "Quiz created"
    );
    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(quiz))))
}

async fn get_quiz(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<QuizResponse>, ApiError> {
    let (quiz, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    let collaborators = repositories::quizzes::list_collaborators(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quiz collaborators"))?;

    Ok(Json(
        QuizResponse::from_db(quiz)
            .with_collaborators(collaborators.into_iter().map(UserResponse::from_db).collect()),
    ))
}

async fn update_quiz(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
    JsonBody(payload): JsonBody<QuizUpdate>,
) -> Result<Json<QuizResponse>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;
    validate_payload(&payload)?;

    let quiz = repositories::quizzes::update(
        state.db(),
        &quiz_id,
        repositories::quizzes::UpdateQuiz {
            slug: payload.slug,
            title: payload.title,
            description: payload.description,
            strict: payload.strict,
            shuffle: payload.shuffle,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Quiz", "Failed to update quiz"))?
    .ok_or(ApiError::NotFound("Quiz"))?;

    Ok(Json(QuizResponse::from_db(quiz)))
}

async fn delete_quiz(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Ownership(&possession)])?;

    repositories::quizzes::delete(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete quiz"))?;

    tracing::info!(action = "quiz_delete", quiz_id = %quiz_id, "Quiz deleted");
    Ok(Json(Ack::Deleted))
}

async fn list_quiz_questions(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    let questions = repositories::quizzes::list_questions(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quiz questions"))?;

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

async fn add_question(
    Path((quiz_id, question_id)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or(ApiError::NotFound("Question"))?;

    let added = repositories::quizzes::add_question(state.db(), &quiz_id, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to add quiz question"))?;
    if !added {
        return Err(ApiError::Duplication("Quiz question"));
    }
    Ok(Json(Ack::Added))
}

async fn remove_question(
    Path((quiz_id, question_id)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Possession(&possession)])?;

    let removed = repositories::quizzes::remove_question(state.db(), &quiz_id, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove quiz question"))?;
    if !removed {
        return Err(ApiError::NotFound("Quiz question"));
    }
    Ok(Json(Ack::Removed))
}

async fn add_collaborator(
    Path((quiz_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Ownership(&possession)])?;
    require_professor_collaborator(&state, &user_id).await?;

    let added = repositories::quizzes::add_collaborator(state.db(), &quiz_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to add quiz collaborator"))?;
    if !added {
        return Err(ApiError::Duplication("Collaborator"));
    }
    tracing::info!(
        action = "quiz_collaborator_add",
        quiz_id = %quiz_id,
        user_id = %user_id,
        "Collaborator added"
    );
    Ok(Json(Ack::Added))
}

async fn remove_collaborator(
    Path((quiz_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentProfessor(current): CurrentProfessor,
) -> Result<Json<Ack>, ApiError> {
    let (_, possession) = load_quiz(&state, &quiz_id).await?;
    authorize(&state.ladder(), &current.caller, &[], &[Check::Ownership(&possession)])?;

    let removed = repositories::quizzes::remove_collaborator(state.db(), &quiz_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove quiz collaborator"))?;
    if !removed {
        return Err(ApiError::NotFound("Collaborator"));
    }
    Ok(Json(Ack::Removed))
}

/// The quiz with its owner and collaborators; 404 when it does not exist.
pub(crate) async fn load_quiz(
    state: &AppState,
    quiz_id: &str,
) -> Result<(Quiz, Possession), ApiError> {
    let quiz = repositories::quizzes::find_by_id(state.db(), quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or(ApiError::NotFound("Quiz"))?;
    let collaborator_ids = repositories::quizzes::collaborator_ids(state.db(), quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz collaborators"))?;
    let possession = Possession::new(quiz.owner_id.clone(), collaborator_ids);
    Ok((quiz, possession))
}

/// Collaborators on quizzes and events must hold professor rank or better.
pub(crate) async fn require_professor_collaborator(
    state: &AppState,
    user_id: &str,
) -> Result<(), ApiError> {
    let user = repositories::users::find_with_role_by_id(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or(ApiError::NotFound("User"))?;
    if state.ladder().satisfies(user.role_permission, Rank::Professor) {
        Ok(())
    } else {
        Err(ApiError::ForbiddenAccessParameter(
            "Collaborators must have professor rank".to_string(),
        ))
    }
}
