use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::request::QuestionType;

/// A single exam question as it appears in the run result
///
/// `question_id` is a stable ordinal, unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub question_id: u32,
    pub question_type: QuestionType,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Always at least 1
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}

/// Sum of all question points
pub fn total_points(questions: &[Question]) -> u32 {
    questions.iter().map(|q| q.points).sum()
}
