//! # Study Notes
//!
//! Structured study-notes document produced alongside the exam. Field docs
//! double as schema descriptions for the content generator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single knowledge point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgePoint {
    /// Knowledge point title
    pub title: String,
    /// Core definition and basic concepts
    pub definition: String,
    /// Detailed explanation
    pub content: String,
    /// Importance: basic, important or core
    pub importance: String,
    /// Concrete examples and application scenarios
    pub examples: Vec<String>,
    /// Key points worth memorising
    pub key_points: Vec<String>,
    /// Common mistakes and pitfalls
    #[serde(default)]
    pub common_mistakes: Option<Vec<String>>,
    /// Links to other knowledge points
    #[serde(default)]
    pub connections: Option<Vec<String>>,
}

/// A study technique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StudyTip {
    /// Category: memorisation, understanding, application or problem solving
    pub category: String,
    pub title: String,
    pub content: String,
    /// Concrete steps
    pub steps: Vec<String>,
    pub applicable_scenarios: Vec<String>,
    #[serde(default)]
    pub examples: Option<Vec<String>>,
    #[serde(default)]
    pub effectiveness: Option<String>,
}

/// Knowledge beyond the core syllabus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtendedKnowledge {
    pub title: String,
    pub content: String,
    /// Relation to the main topic
    pub connection: String,
    /// Difficulty: easy, medium or hard
    pub difficulty_level: String,
    pub applications: Vec<String>,
    #[serde(default)]
    pub historical_context: Option<String>,
    #[serde(default)]
    pub cross_subject_links: Option<Vec<String>>,
}

/// A recommended book, website, video or tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LearningResource {
    /// Resource type: book, website, video or tool
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub recommendation_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Faq {
    pub question: String,
    pub answer: String,
    pub category: String,
}

/// Tiered practice plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PracticeRecommendation {
    /// Level: basic, intermediate, comprehensive or creative
    pub level: String,
    pub title: String,
    pub description: String,
    pub methods: Vec<String>,
    /// Suggested time allocation
    pub time_suggestion: String,
}

/// Complete study notes for a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StudyNotes {
    /// Detailed overview of the topic
    pub topic_overview: String,
    pub learning_objectives: Vec<String>,
    /// Core knowledge points
    pub knowledge_points: Vec<KnowledgePoint>,
    pub study_tips: Vec<StudyTip>,
    pub extended_knowledge: Vec<ExtendedKnowledge>,
    /// Systematic summary
    pub summary: String,
    /// Description of how the knowledge fits together
    pub knowledge_structure: String,
    pub practice_recommendations: Vec<PracticeRecommendation>,
    pub learning_resources: Vec<LearningResource>,
    pub faqs: Vec<Faq>,
    /// Self-assessment methods
    pub self_assessment: Vec<String>,
}
