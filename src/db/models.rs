use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{PrimitiveDateTime, Time};

use crate::db::types::{AnswerType, QuestionType, VerificationType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Role {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) permission: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) hashed_password: String,
    pub(crate) gender: Option<String>,
    pub(crate) role_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A user joined with the role it belongs to, as needed for token issuing.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserWithRole {
    #[sqlx(flatten)]
    pub(crate) user: User,
    pub(crate) role_slug: String,
    pub(crate) role_permission: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Group {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Label {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Specification {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) strict: bool,
    pub(crate) shuffle: bool,
    pub(crate) owner_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) question_type: QuestionType,
    pub(crate) typed_question_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TextualQuestion {
    pub(crate) id: String,
    pub(crate) case_sensitive: bool,
    pub(crate) accent_sensitive: bool,
    pub(crate) verification_type: VerificationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct NumericQuestion {
    pub(crate) id: String,
    pub(crate) specification_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ChoiceQuestion {
    pub(crate) id: String,
    pub(crate) shuffle: bool,
    pub(crate) specification_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Choice {
    pub(crate) id: String,
    pub(crate) choice_question_id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) valid: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// The concrete subtype row linked to a [`Question`] through its
/// discriminator and typed id.
#[derive(Debug, Clone)]
pub(crate) enum TypedQuestion {
    Textual(TextualQuestion),
    Numeric(NumericQuestion),
    Choice { question: ChoiceQuestion, choices: Vec<Choice> },
}

impl TypedQuestion {
    pub(crate) fn question_type(&self) -> QuestionType {
        match self {
            TypedQuestion::Textual(_) => QuestionType::TextualQuestion,
            TypedQuestion::Numeric(_) => QuestionType::NumericQuestion,
            TypedQuestion::Choice { .. } => QuestionType::ChoiceQuestion,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) answer_type: AnswerType,
    pub(crate) typed_answer_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExactAnswer {
    pub(crate) id: String,
    pub(crate) answer_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ComparisonAnswer {
    pub(crate) id: String,
    pub(crate) greater_than: f64,
    pub(crate) lower_than: f64,
}

#[derive(Debug, Clone)]
pub(crate) enum TypedAnswer {
    Exact(ExactAnswer),
    Comparison(ComparisonAnswer),
}

impl TypedAnswer {
    pub(crate) fn answer_type(&self) -> AnswerType {
        match self {
            TypedAnswer::Exact(_) => AnswerType::ExactAnswer,
            TypedAnswer::Comparison(_) => AnswerType::ComparisonAnswer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Event {
    pub(crate) id: String,
    pub(crate) start_at: PrimitiveDateTime,
    pub(crate) end_at: PrimitiveDateTime,
    pub(crate) countdown: Time,
    pub(crate) started: bool,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) owner_id: String,
    pub(crate) group_id: String,
    pub(crate) quiz_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct EventWarn {
    pub(crate) id: String,
    pub(crate) amount: i32,
    pub(crate) event_id: String,
    pub(crate) user_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserAnswer {
    pub(crate) id: String,
    pub(crate) answer_content: String,
    pub(crate) valid: Option<bool>,
    pub(crate) user_id: String,
    pub(crate) question_id: String,
    pub(crate) event_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
