//! # Notes Skill
//!
//! Study notes written from the same research blob the questions use.

use super::prompts::NOTES_WRITER;
use super::SkillContext;
use crate::error::GenerationFailure;
use crate::generator::{generate_structured, Prompt};
use crate::pipeline::PipelineStage;
use crate::state::{RunRequest, StudyNotes};

pub const TEMPERATURE: f32 = 0.3;

pub struct NotesSkill;

impl NotesSkill {
    pub fn prompt(request: &RunRequest, research_blob: &str, ctx: &SkillContext) -> Prompt {
        let text = ctx.render_prompt(NOTES_WRITER, request, &[("research_content", research_blob)]);
        Prompt::new(PipelineStage::GeneratingNotes, text, TEMPERATURE)
    }

    pub async fn run(
        request: &RunRequest,
        research_blob: &str,
        ctx: &SkillContext,
    ) -> Result<StudyNotes, GenerationFailure> {
        let prompt = Self::prompt(request, research_blob, ctx);
        generate_structured(ctx.generator.as_ref(), &prompt).await
    }
}
