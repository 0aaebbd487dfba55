use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::answer_submission::{SubmissionError, SubmissionRejection};
use crate::services::event_overlap::ScheduleError;
use crate::services::permissions::PolicyDenied;
use crate::services::warnings::WarningBlock;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    InvalidInput(String),
    InvalidCredentials,
    NotFound(&'static str),
    Duplication(&'static str),
    AccessForbidden,
    ForbiddenAccessParameter(String),
    Unauthorized(&'static str),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    /// Unique violations become `Duplication(thing)`, anything else is internal.
    pub(crate) fn from_write(err: sqlx::Error, thing: &'static str, context: &str) -> Self {
        let unique = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);
        if unique {
            Self::Duplication(thing)
        } else {
            Self::internal(err, context)
        }
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidCredentials => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplication(_) => StatusCode::CONFLICT,
            ApiError::AccessForbidden | ApiError::ForbiddenAccessParameter(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn message(&self) -> String {
        match self {
            ApiError::InvalidInput(message) => message.clone(),
            ApiError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiError::NotFound(thing) => format!("{thing} not found"),
            ApiError::Duplication(thing) => format!("{thing} already exists"),
            ApiError::AccessForbidden => "Access forbidden".to_string(),
            ApiError::ForbiddenAccessParameter(message) => message.clone(),
            ApiError::Unauthorized(message) | ApiError::TooManyRequests(message) => {
                (*message).to_string()
            }
            ApiError::Internal(context) => context.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(ErrorResponse { error: self.message() })).into_response();
        if matches!(self, ApiError::Unauthorized(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<PolicyDenied> for ApiError {
    fn from(_: PolicyDenied) -> Self {
        ApiError::AccessForbidden
    }
}

impl From<WarningBlock> for ApiError {
    fn from(block: WarningBlock) -> Self {
        tracing::info!(reason = %block, "Warning gate blocked the caller");
        ApiError::AccessForbidden
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Rejected(rejection) => match rejection {
                SubmissionRejection::InvalidPayload(message) => {
                    ApiError::InvalidInput(message.to_string())
                }
                SubmissionRejection::UserNotFound => ApiError::NotFound("User"),
                SubmissionRejection::EventNotFound => ApiError::NotFound("Event"),
                SubmissionRejection::QuestionNotFound => ApiError::NotFound("Question"),
                SubmissionRejection::AlreadyAnswered => ApiError::Duplication("UserAnswer"),
                SubmissionRejection::Warning(block) => block.into(),
            },
            SubmissionError::Database(err) => ApiError::internal(err, "Failed to submit answer"),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Window(window) => ApiError::InvalidInput(window.to_string()),
            ScheduleError::GroupNotFound => ApiError::NotFound("Group"),
            ScheduleError::QuizNotFound => ApiError::NotFound("Quiz"),
            ScheduleError::Conflict { .. } => ApiError::Duplication("Event"),
            ScheduleError::Database(err) => ApiError::internal(err, "Failed to schedule event"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value, Option<HeaderValue>) {
        let response = error.into_response();
        let status = response.status();
        let auth = response.headers().get(header::WWW_AUTHENTICATE).cloned();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap(), auth)
    }

    #[tokio::test]
    async fn not_found_names_the_entity() {
        let (status, body, _) = body_of(ApiError::NotFound("Event")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "Event not found"}));
    }

    #[tokio::test]
    async fn duplication_is_conflict() {
        let (status, body, _) = body_of(ApiError::Duplication("UserAnswer")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "UserAnswer already exists");
    }

    #[tokio::test]
    async fn credentials_share_the_input_status() {
        let (status, _, _) = body_of(ApiError::InvalidCredentials).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unauthorized_sets_bearer_challenge() {
        let (status, _, auth) = body_of(ApiError::Unauthorized("Invalid token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(auth, Some(HeaderValue::from_static("Bearer")));
    }

    #[tokio::test]
    async fn internal_reports_context_not_cause() {
        let (status, body, _) = body_of(ApiError::internal("boom", "Failed to load")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to load");
    }

    #[test]
    fn submission_rejections_map_to_taxonomy() {
        let cases = [
            (SubmissionRejection::UserNotFound, StatusCode::NOT_FOUND),
            (SubmissionRejection::EventNotFound, StatusCode::NOT_FOUND),
            (SubmissionRejection::QuestionNotFound, StatusCode::NOT_FOUND),
            (SubmissionRejection::AlreadyAnswered, StatusCode::CONFLICT),
            (SubmissionRejection::Warning(WarningBlock::Submission), StatusCode::FORBIDDEN),
            (SubmissionRejection::InvalidPayload("bad"), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (rejection, expected) in cases {
            let error = ApiError::from(SubmissionError::Rejected(rejection));
            assert_eq!(error.status(), expected);
        }
    }

    #[test]
    fn schedule_conflict_is_event_duplication() {
        let error = ApiError::from(ScheduleError::Conflict { event_id: "e1".to_string() });
        assert_eq!(error.message(), "Event already exists");
    }
}
