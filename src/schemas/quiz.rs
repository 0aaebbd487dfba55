use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Quiz;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 128, message = "slug must be 1-128 characters"))]
    pub(crate) slug: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) strict: bool,
    #[serde(default)]
    pub(crate) shuffle: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "slug must be 1-128 characters"))]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) strict: Option<bool>,
    #[serde(default)]
    pub(crate) shuffle: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) strict: bool,
    pub(crate) shuffle: bool,
    pub(crate) owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) collaborators: Option<Vec<UserResponse>>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            slug: quiz.slug,
            title: quiz.title,
            description: quiz.description,
            strict: quiz.strict,
            shuffle: quiz.shuffle,
            owner_id: quiz.owner_id,
            collaborators: None,
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }

    pub(crate) fn with_collaborators(mut self, collaborators: Vec<UserResponse>) -> Self {
        self.collaborators = Some(collaborators);
        self
    }
}
