//! # Examforge Skills
//!
//! One skill per pipeline stage. A skill reads the request and a view of the
//! run state, calls the content generator, and hands back data for the
//! coordinator to merge. Only [`RenderSkill`] touches the filesystem.
//!
//! ## Stages
//!
//! - `TopicPlannerSkill` - choose research topics
//! - `ResearcherSkill` - research one topic (run once per branch)
//! - `QuestionSkill` - write and normalise the questions
//! - `MetadataSkill` - title, instructions, total points, time limit
//! - `NotesSkill` - structured study notes
//! - `RenderSkill` - exam, answer key and notes documents

pub mod prompts;

pub mod metadata_skill;
pub mod notes_skill;
pub mod question_skill;
pub mod render_skill;
pub mod researcher_skill;
pub mod topic_planner_skill;

pub use metadata_skill::MetadataSkill;
pub use notes_skill::NotesSkill;
pub use question_skill::QuestionSkill;
pub use render_skill::RenderSkill;
pub use researcher_skill::ResearcherSkill;
pub use topic_planner_skill::{target_topic_count, TopicPlannerSkill};

use std::sync::Arc;

use crate::generator::ContentGenerator;
use crate::state::{subject_description, RunRequest};

/// Everything a generating skill needs besides its inputs
#[derive(Clone)]
pub struct SkillContext {
    pub generator: Arc<dyn ContentGenerator>,
    /// Language generated content is written in
    pub language: String,
    pub current_date: String,
}

impl SkillContext {
    pub fn new(generator: Arc<dyn ContentGenerator>, language: impl Into<String>) -> Self {
        Self {
            generator,
            language: language.into(),
            current_date: chrono::Local::now().format("%B %d, %Y").to_string(),
        }
    }

    /// Fill a template with `extra` values and the request fields every
    /// prompt shares
    pub(crate) fn render_prompt(
        &self,
        template: &str,
        request: &RunRequest,
        extra: &[(&str, &str)],
    ) -> String {
        let question_count = request.question_count.to_string();
        let question_types = request.question_types_list();
        // Stage-specific values win over the shared ones
        let mut vars: Vec<(&str, &str)> = extra.to_vec();
        vars.extend([
            ("current_date", self.current_date.as_str()),
            ("language", self.language.as_str()),
            ("education_level", request.education_level.as_str()),
            ("education_level_desc", request.education_level.description()),
            ("subject", request.subject.as_str()),
            ("subject_desc", subject_description(&request.subject)),
            ("knowledge_topic", request.topic.as_str()),
            ("difficulty_level", request.difficulty.as_str()),
            ("question_count", question_count.as_str()),
            ("question_types", question_types.as_str()),
        ]);
        prompts::fill(template, &vars)
    }
}
