//! # Metadata Skill
//!
//! Title, instructions and time limit for the exam cover page. The
//! generator only sees question counts and types, never question content.

use schemars::JsonSchema;
use serde::Deserialize;

use super::prompts::EXAM_COMPILER;
use super::SkillContext;
use crate::error::GenerationFailure;
use crate::generator::{generate_structured, Prompt};
use crate::pipeline::PipelineStage;
use crate::state::{total_points, ExamMetadata, Question, RunRequest};

pub const TEMPERATURE: f32 = 0.3;

/// Output from the exam compiler
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MetadataDraft {
    /// Title of the exam
    pub title: String,
    /// General instructions for taking the exam
    pub instructions: String,
    /// Suggested time limit, e.g. "45 minutes"
    #[serde(default)]
    pub time_limit: Option<String>,
}

pub struct MetadataSkill;

impl MetadataSkill {
    pub fn prompt(request: &RunRequest, questions: &[Question], ctx: &SkillContext) -> Prompt {
        let question_count = questions.len().to_string();
        let points = total_points(questions).to_string();
        let text = ctx.render_prompt(
            EXAM_COMPILER,
            request,
            &[
                ("question_count", question_count.as_str()),
                ("total_points", points.as_str()),
            ],
        );
        Prompt::new(PipelineStage::CompilingMetadata, text, TEMPERATURE)
    }

    pub async fn run(
        request: &RunRequest,
        questions: &[Question],
        ctx: &SkillContext,
    ) -> Result<ExamMetadata, GenerationFailure> {
        let prompt = Self::prompt(request, questions, ctx);
        let draft: MetadataDraft = generate_structured(ctx.generator.as_ref(), &prompt).await?;

        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(GenerationFailure::invalid("MetadataDraft", "title is blank"));
        }

        let time_limit = draft
            .time_limit
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| suggested_time_limit(questions));

        Ok(ExamMetadata {
            title,
            instructions: draft.instructions.trim().to_string(),
            total_points: total_points(questions),
            time_limit,
        })
    }
}

/// Time limit from per-type answering times, rounded up to 5 minutes
pub fn suggested_time_limit(questions: &[Question]) -> String {
    let minutes: u32 = questions.iter().map(|q| q.question_type.minutes()).sum();
    let rounded = minutes.div_ceil(5).max(1) * 5;
    format!("{} minutes", rounded)
}
