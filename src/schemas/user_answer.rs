use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::models::UserAnswer;

/// Either a single `answer` or a list of `answers`, never both.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserAnswerSubmit {
    #[serde(default)]
    #[validate(length(min = 1, message = "answer must not be empty"))]
    pub(crate) answer: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "no_empty_answers"))]
    pub(crate) answers: Option<Vec<String>>,
}

fn no_empty_answers(answers: &[String]) -> Result<(), ValidationError> {
    if answers.iter().any(String::is_empty) {
        return Err(ValidationError::new("empty_answer")
            .with_message("answers must not contain empty entries".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserAnswerValidity {
    pub(crate) valid: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserAnswerResponse {
    pub(crate) id: String,
    pub(crate) answer_content: String,
    pub(crate) valid: Option<bool>,
    pub(crate) user_id: String,
    pub(crate) question_id: String,
    pub(crate) event_id: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl UserAnswerResponse {
    pub(crate) fn from_db(answer: UserAnswer) -> Self {
        Self {
            id: answer.id,
            answer_content: answer.answer_content,
            valid: answer.valid,
            user_id: answer.user_id,
            question_id: answer.question_id,
            event_id: answer.event_id,
            created_at: format_primitive(answer.created_at),
            updated_at: format_primitive(answer.updated_at),
        }
    }
}

/// One object for a single `answer`, a list for `answers`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum SubmittedAnswers {
    Single(UserAnswerResponse),
    Batch(Vec<UserAnswerResponse>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn answer(id: &str) -> UserAnswerResponse {
        let now = primitive_now_utc();
        UserAnswerResponse::from_db(UserAnswer {
            id: id.to_string(),
            answer_content: "42".to_string(),
            valid: None,
            user_id: "u1".to_string(),
            question_id: "q1".to_string(),
            event_id: Some("e1".to_string()),
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn single_submission_is_an_object() {
        let value = serde_json::to_value(SubmittedAnswers::Single(answer("a1"))).unwrap();
        assert_eq!(value["id"], "a1");
        assert_eq!(value["answerContent"], "42");
        assert!(value["valid"].is_null());
    }

    #[test]
    fn batch_submission_is_a_list() {
        let value =
            serde_json::to_value(SubmittedAnswers::Batch(vec![answer("a1"), answer("a2")])).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn submit_payload_accepts_either_shape() {
        let single: UserAnswerSubmit =
            serde_json::from_value(serde_json::json!({"answer": "Paris"})).unwrap();
        assert_eq!(single.answer.as_deref(), Some("Paris"));
        let batch: UserAnswerSubmit =
            serde_json::from_value(serde_json::json!({"answers": ["a", "b"]})).unwrap();
        assert_eq!(batch.answers.map(|answers| answers.len()), Some(2));
    }

    #[test]
    fn empty_answer_contents_fail_validation() {
        let single: UserAnswerSubmit =
            serde_json::from_value(serde_json::json!({"answer": ""})).unwrap();
        assert!(single.validate().is_err());

        let batch: UserAnswerSubmit =
            serde_json::from_value(serde_json::json!({"answers": ["a", ""]})).unwrap();
        assert!(batch.validate().is_err());

        let fine: UserAnswerSubmit =
            serde_json::from_value(serde_json::json!({"answers": ["a", "b"]})).unwrap();
        assert!(fine.validate().is_ok());
    }
}
