//! # Run Request
//!
//! The immutable input of one run and its validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::InvalidRequest;

/// Upper bound on questions per run
pub const MAX_QUESTION_COUNT: u32 = 100;

/// School stage the exam targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Primary,
    #[default]
    Middle,
    High,
}

impl EducationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::Primary => "primary",
            EducationLevel::Middle => "middle",
            EducationLevel::High => "high",
        }
    }

    /// Human description used in prompts and rendered headers
    pub fn description(&self) -> &'static str {
        match self {
            EducationLevel::Primary => "primary school (grades 1-6)",
            EducationLevel::Middle => "middle school (grades 7-9)",
            EducationLevel::High => "high school (grades 10-12)",
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of question kinds an exam may contain
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
    Calculation,
    Application,
    Analysis,
    Essay,
}

impl QuestionType {
    pub fn all() -> [QuestionType; 8] {
        [
            QuestionType::MultipleChoice,
            QuestionType::TrueFalse,
            QuestionType::FillBlank,
            QuestionType::ShortAnswer,
            QuestionType::Calculation,
            QuestionType::Application,
            QuestionType::Analysis,
            QuestionType::Essay,
        ]
    }

    /// Wire name (`multiple_choice`, `true_false`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Calculation => "calculation",
            QuestionType::Application => "application",
            QuestionType::Analysis => "analysis",
            QuestionType::Essay => "essay",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True / False",
            QuestionType::FillBlank => "Fill in the Blank",
            QuestionType::ShortAnswer => "Short Answer",
            QuestionType::Calculation => "Calculation",
            QuestionType::Application => "Application",
            QuestionType::Analysis => "Analysis",
            QuestionType::Essay => "Essay",
        }
    }

    /// Points assigned when the generator leaves them unspecified (1-5)
    pub fn default_points(&self) -> u32 {
        match self {
            QuestionType::TrueFalse => 1,
            QuestionType::MultipleChoice | QuestionType::FillBlank => 2,
            QuestionType::ShortAnswer => 3,
            QuestionType::Calculation | QuestionType::Application => 4,
            QuestionType::Analysis | QuestionType::Essay => 5,
        }
    }

    /// Expected answering time in minutes, used to suggest a time limit
    pub fn minutes(&self) -> u32 {
        match self {
            QuestionType::TrueFalse => 1,
            QuestionType::MultipleChoice | QuestionType::FillBlank => 2,
            QuestionType::ShortAnswer => 4,
            QuestionType::Calculation | QuestionType::Application => 6,
            QuestionType::Analysis => 8,
            QuestionType::Essay => 15,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known subject codes and their descriptions
const SUBJECTS: [(&str, &str); 15] = [
    ("chinese", "Chinese language and literature"),
    ("math", "Mathematics"),
    ("english", "English"),
    ("physics", "Physics"),
    ("chemistry", "Chemistry"),
    ("biology", "Biology"),
    ("history", "History"),
    ("geography", "Geography"),
    ("politics", "Politics / Morality and Law"),
    ("science", "Science"),
    ("moral", "Morality and Law"),
    ("art", "Fine Arts"),
    ("music", "Music"),
    ("pe", "Physical Education"),
    ("technology", "Information Technology"),
];

/// Description of a subject code, or the code itself when unknown
pub fn subject_description(subject: &str) -> &str {
    SUBJECTS
        .iter()
        .find(|(code, _)| *code == subject)
        .map(|(_, desc)| *desc)
        .unwrap_or(subject)
}

fn default_subject() -> String {
    "math".to_string()
}

fn default_question_count() -> u32 {
    10
}

fn default_question_types() -> BTreeSet<QuestionType> {
    BTreeSet::from([QuestionType::MultipleChoice, QuestionType::ShortAnswer])
}

/// Immutable input of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub education_level: EducationLevel,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(rename = "knowledge_topic", alias = "topic")]
    pub topic: String,
    #[serde(rename = "difficulty_level", alias = "difficulty", default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_question_count")]
    pub question_count: u32,
    #[serde(default = "default_question_types")]
    pub question_types: BTreeSet<QuestionType>,
}

impl RunRequest {
    /// Request with the default level, subject, difficulty, count and types
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            education_level: EducationLevel::default(),
            subject: default_subject(),
            topic: topic.into(),
            difficulty: Difficulty::default(),
            question_count: default_question_count(),
            question_types: default_question_types(),
        }
    }

    pub fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = count;
        self
    }

    pub fn with_question_types(mut self, types: impl IntoIterator<Item = QuestionType>) -> Self {
        self.question_types = types.into_iter().collect();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_education_level(mut self, level: EducationLevel) -> Self {
        self.education_level = level;
        self
    }

    /// Reject blank topics, out-of-range counts and empty type sets
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        if self.topic.trim().is_empty() {
            return Err(InvalidRequest::EmptyTopic);
        }
        if self.question_count == 0 || self.question_count > MAX_QUESTION_COUNT {
            return Err(InvalidRequest::QuestionCount {
                count: self.question_count,
                max: MAX_QUESTION_COUNT,
            });
        }
        if self.question_types.is_empty() {
            return Err(InvalidRequest::NoQuestionTypes);
        }
        Ok(())
    }

    /// Requested types as a comma-separated list of wire names
    pub fn question_types_list(&self) -> String {
        self.question_types
            .iter()
            .map(QuestionType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
