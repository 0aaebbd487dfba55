use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "questiontype", rename_all = "camelCase")]
pub(crate) enum QuestionType {
    TextualQuestion,
    NumericQuestion,
    ChoiceQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "verificationtype", rename_all = "lowercase")]
pub(crate) enum VerificationType {
    #[default]
    Exact,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "answertype", rename_all = "camelCase")]
pub(crate) enum AnswerType {
    ExactAnswer,
    ComparisonAnswer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminators_use_camel_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(QuestionType::ChoiceQuestion).unwrap(),
            serde_json::json!("choiceQuestion")
        );
        assert_eq!(
            serde_json::to_value(AnswerType::ComparisonAnswer).unwrap(),
            serde_json::json!("comparisonAnswer")
        );
        assert_eq!(VerificationType::default(), VerificationType::Exact);
    }
}
