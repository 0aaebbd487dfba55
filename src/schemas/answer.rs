use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{Answer, TypedAnswer};
use crate::db::types::AnswerType;
use crate::repositories::answers::NewTypedAnswer;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct TypedAnswerPayload {
    pub(crate) answer_content: Option<String>,
    pub(crate) greater_than: Option<f64>,
    pub(crate) lower_than: Option<f64>,
}

impl TypedAnswerPayload {
    /// Checks the fields required by `answer_type`. Comparison bounds may be
    /// equal but never inverted.
    pub(crate) fn into_new(self, answer_type: AnswerType) -> Result<NewTypedAnswer, String> {
        match answer_type {
            AnswerType::ExactAnswer => {
                let answer_content = self
                    .answer_content
                    .filter(|content| !content.trim().is_empty())
                    .ok_or_else(|| "answerContent is required for exact answers".to_string())?;
                Ok(NewTypedAnswer::Exact { answer_content })
            }
            AnswerType::ComparisonAnswer => {
                let (Some(greater_than), Some(lower_than)) = (self.greater_than, self.lower_than)
                else {
                    return Err(
                        "greaterThan and lowerThan are required for comparison answers".to_string()
                    );
                };
                if !greater_than.is_finite() || !lower_than.is_finite() {
                    return Err("comparison bounds must be finite numbers".to_string());
                }
                if lower_than < greater_than {
                    return Err(
                        "lowerThan must be greater than or equal to greaterThan".to_string()
                    );
                }
                Ok(NewTypedAnswer::Comparison { greater_than, lower_than })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerCreate {
    pub(crate) answer_type: AnswerType,
    #[serde(default)]
    pub(crate) typed_answer: TypedAnswerPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerUpdate {
    pub(crate) typed_answer: TypedAnswerPayload,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum TypedAnswerResponse {
    #[serde(rename_all = "camelCase")]
    Exact { id: String, answer_content: String },
    #[serde(rename_all = "camelCase")]
    Comparison { id: String, greater_than: f64, lower_than: f64 },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) answer_type: AnswerType,
    pub(crate) typed_answer: TypedAnswerResponse,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AnswerResponse {
    pub(crate) fn from_db(answer: Answer, typed: TypedAnswer) -> Self {
        let typed_answer = match typed {
            TypedAnswer::Exact(exact) => TypedAnswerResponse::Exact {
                id: exact.id,
                answer_content: exact.answer_content,
            },
            TypedAnswer::Comparison(comparison) => TypedAnswerResponse::Comparison {
                id: comparison.id,
                greater_than: comparison.greater_than,
                lower_than: comparison.lower_than,
            },
        };
        Self {
            id: answer.id,
            answer_type: answer.answer_type,
            typed_answer,
            created_at: format_primitive(answer.created_at),
            updated_at: format_primitive(answer.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(greater_than: f64, lower_than: f64) -> TypedAnswerPayload {
        TypedAnswerPayload {
            greater_than: Some(greater_than),
            lower_than: Some(lower_than),
            ..Default::default()
        }
    }

    #[test]
    fn equal_comparison_bounds_are_accepted() {
        let typed = comparison(5.0, 5.0).into_new(AnswerType::ComparisonAnswer).expect("valid");
        assert!(matches!(
            typed,
            NewTypedAnswer::Comparison { greater_than, lower_than }
                if greater_than == 5.0 && lower_than == 5.0
        ));
    }

    #[test]
    fn inverted_comparison_bounds_are_rejected() {
        assert!(comparison(5.0, 4.0).into_new(AnswerType::ComparisonAnswer).is_err());
    }

    #[test]
    fn comparison_requires_both_bounds() {
        let payload = TypedAnswerPayload { greater_than: Some(1.0), ..Default::default() };
        assert!(payload.into_new(AnswerType::ComparisonAnswer).is_err());
    }

    #[test]
    fn exact_answer_requires_content() {
        assert!(TypedAnswerPayload::default().into_new(AnswerType::ExactAnswer).is_err());
        let payload =
            TypedAnswerPayload { answer_content: Some("Paris".into()), ..Default::default() };
        assert!(matches!(
            payload.into_new(AnswerType::ExactAnswer),
            Ok(NewTypedAnswer::Exact { answer_content }) if answer_content == "Paris"
        ));
    }
}
