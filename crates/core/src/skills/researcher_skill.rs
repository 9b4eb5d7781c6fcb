//! # Researcher Skill
//!
//! Researches a single topic for one fan-out branch. A branch sees only its
//! own [`ResearchBranch`]; findings come back tagged with the branch index
//! and topic so callers never depend on completion order.

use super::prompts::RESEARCHER;
use super::SkillContext;
use crate::error::GenerationFailure;
use crate::generator::{generate_text, Prompt};
use crate::pipeline::PipelineStage;
use crate::state::{ResearchBranch, ResearchFinding, RunRequest};

pub const TEMPERATURE: f32 = 0.3;

pub struct ResearcherSkill;

impl ResearcherSkill {
    pub fn prompt(branch: &ResearchBranch, request: &RunRequest, ctx: &SkillContext) -> Prompt {
        let text = ctx.render_prompt(
            RESEARCHER,
            request,
            &[
                ("research_topic", branch.topic.as_str()),
                ("main_topic", branch.parent_topic.as_str()),
                ("difficulty_level", branch.difficulty.as_str()),
            ],
        );
        Prompt::new(PipelineStage::ResearchingKnowledge, text, TEMPERATURE)
    }

    pub async fn run(
        branch: &ResearchBranch,
        request: &RunRequest,
        ctx: &SkillContext,
    ) -> Result<ResearchFinding, GenerationFailure> {
        let prompt = Self::prompt(branch, request, ctx);
        let content = generate_text(ctx.generator.as_ref(), &prompt).await?;

        Ok(ResearchFinding {
            branch_index: branch.branch_index,
            topic: branch.topic.clone(),
            content,
        })
    }
}
