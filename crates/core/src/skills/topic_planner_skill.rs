//! # Topic Planner Skill
//!
//! Chooses the research topics the research stage fans out over.

use schemars::JsonSchema;
use serde::Deserialize;

use super::prompts::TOPIC_PLANNER;
use super::SkillContext;
use crate::error::GenerationFailure;
use crate::generator::{generate_structured, Prompt};
use crate::pipeline::PipelineStage;
use crate::state::RunRequest;

pub const TEMPERATURE: f32 = 0.7;

/// Output from the topic planner
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicPlan {
    /// Specific research topics to gather information about
    pub topics: Vec<String>,
}

/// Number of topics to request: a third of the questions, kept within 3..=8
pub fn target_topic_count(question_count: u32) -> usize {
    (question_count / 3).clamp(3, 8) as usize
}

pub struct TopicPlannerSkill;

impl TopicPlannerSkill {
    pub fn prompt(request: &RunRequest, ctx: &SkillContext) -> Prompt {
        let num_topics = target_topic_count(request.question_count).to_string();
        let text = ctx.render_prompt(TOPIC_PLANNER, request, &[("num_topics", num_topics.as_str())]);
        Prompt::new(PipelineStage::PlanningTopics, text, TEMPERATURE)
    }

    /// Returns the planned topics with blank entries removed. May be empty;
    /// the coordinator decides on the fallback.
    pub async fn run(
        request: &RunRequest,
        ctx: &SkillContext,
    ) -> Result<Vec<String>, GenerationFailure> {
        let prompt = Self::prompt(request, ctx);
        let plan: TopicPlan = generate_structured(ctx.generator.as_ref(), &prompt).await?;

        Ok(plan
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, ScriptedGenerator};
    use std::sync::Arc;

    #[test]
    fn test_target_topic_count_is_clamped() {
        assert_eq!(target_topic_count(1), 3);
        assert_eq!(target_topic_count(6), 3);
        assert_eq!(target_topic_count(12), 4);
        assert_eq!(target_topic_count(24), 8);
        assert_eq!(target_topic_count(100), 8);
    }

    #[test]
    fn test_prompt_requests_target_count() {
        let generator = Arc::new(ScriptedGenerator::new());
        let request = RunRequest::new("photosynthesis").with_question_count(15);
        let prompt = TopicPlannerSkill::prompt(&request, &context(generator));

        assert!(prompt.text.contains("exactly 5 specific research topics"));
        assert!(prompt.text.contains("photosynthesis"));
        assert!(!prompt.text.contains("{num_topics}"));
        assert_eq!(prompt.temperature, 0.7);
    }

    #[tokio::test]
    async fn test_blank_topics_are_dropped() {
        let generator = Arc::new(
            ScriptedGenerator::new().with_topics(&["light reactions", "  ", "", "Calvin cycle "]),
        );
        let topics = TopicPlannerSkill::run(&RunRequest::new("photosynthesis"), &context(generator))
            .await
            .unwrap();
        assert_eq!(topics, vec!["light reactions", "Calvin cycle"]);
    }
}
