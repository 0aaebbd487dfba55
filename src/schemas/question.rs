use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Choice, Question, TypedQuestion};
use crate::db::types::{QuestionType, VerificationType};
use crate::repositories::questions::NewTypedQuestion;

/// Subtype fields of a question. Which of them apply depends on the
/// question type; the others are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct TypedQuestionPayload {
    pub(crate) case_sensitive: bool,
    pub(crate) accent_sensitive: bool,
    pub(crate) verification_type: VerificationType,
    pub(crate) shuffle: bool,
    pub(crate) specification_id: Option<String>,
}

impl TypedQuestionPayload {
    pub(crate) fn into_new(self, question_type: QuestionType) -> NewTypedQuestion {
        match question_type {
            QuestionType::TextualQuestion => NewTypedQuestion::Textual {
                case_sensitive: self.case_sensitive,
                accent_sensitive: self.accent_sensitive,
                verification_type: self.verification_type,
            },
            QuestionType::NumericQuestion => {
                NewTypedQuestion::Numeric { specification_id: self.specification_id }
            }
            QuestionType::ChoiceQuestion => NewTypedQuestion::Choice {
                shuffle: self.shuffle,
                specification_id: self.specification_id,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, max = 128, message = "slug must be 1-128 characters"))]
    pub(crate) slug: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) typed_question: TypedQuestionPayload,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "slug must be 1-128 characters"))]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) typed_question: Option<TypedQuestionPayload>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChoiceCreate {
    #[validate(length(min = 1, message = "slug must not be empty"))]
    pub(crate) slug: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) valid: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChoiceUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "slug must not be empty"))]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) valid: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChoiceResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) valid: Option<bool>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ChoiceResponse {
    pub(crate) fn from_db(choice: Choice, reveal_validity: bool) -> Self {
        Self {
            id: choice.id,
            slug: choice.slug,
            name: choice.name,
            valid: reveal_validity.then_some(choice.valid),
            created_at: format_primitive(choice.created_at),
            updated_at: format_primitive(choice.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum TypedQuestionResponse {
    #[serde(rename_all = "camelCase")]
    Textual {
        id: String,
        case_sensitive: bool,
        accent_sensitive: bool,
        verification_type: VerificationType,
    },
    #[serde(rename_all = "camelCase")]
    Numeric { id: String, specification_id: Option<String> },
    #[serde(rename_all = "camelCase")]
    Choice {
        id: String,
        shuffle: bool,
        specification_id: Option<String>,
        choices: Vec<ChoiceResponse>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) question_type: QuestionType,
    pub(crate) typed_question: TypedQuestionResponse,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionResponse {
    /// `reveal_validity` is off for students, who must not see which
    /// choices are correct.
    pub(crate) fn from_db(question: Question, typed: TypedQuestion, reveal_validity: bool) -> Self {
        let typed_question = match typed {
            TypedQuestion::Textual(textual) => TypedQuestionResponse::Textual {
                id: textual.id,
                case_sensitive: textual.case_sensitive,
                accent_sensitive: textual.accent_sensitive,
                verification_type: textual.verification_type,
            },
            TypedQuestion::Numeric(numeric) => TypedQuestionResponse::Numeric {
                id: numeric.id,
                specification_id: numeric.specification_id,
            },
            TypedQuestion::Choice { question: choice, choices } => TypedQuestionResponse::Choice {
                id: choice.id,
                shuffle: choice.shuffle,
                specification_id: choice.specification_id,
                choices: choices
                    .into_iter()
                    .map(|choice| ChoiceResponse::from_db(choice, reveal_validity))
                    .collect(),
            },
        };

        Self {
            id: question.id,
            slug: question.slug,
            title: question.title,
            description: question.description,
            question_type: question.question_type,
            typed_question,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}
