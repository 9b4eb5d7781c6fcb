//! # Question Skill
//!
//! Writes the exam questions from the research blob and normalises them:
//! ids are renumbered, missing points get a per-type default, and every
//! multiple-choice answer is resolved to the text of one of its options.

use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::LazyLock;

use super::prompts::QUESTION_WRITER;
use super::SkillContext;
use crate::error::GenerationFailure;
use crate::generator::{generate_structured, Prompt};
use crate::pipeline::PipelineStage;
use crate::state::{Question, QuestionType, RunRequest};

pub const TEMPERATURE: f32 = 0.5;

const SHAPE: &str = "QuestionSet";

/// A question as written by the generator, before normalisation
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QuestionDraft {
    /// Ordinal of the question, starting at 1
    #[serde(default)]
    pub question_id: Option<u32>,
    pub question_type: QuestionType,
    pub question_text: String,
    /// Options for multiple choice questions
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Correct answer; for multiple choice, the text of the correct option
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Points awarded, 1 to 5
    #[serde(default)]
    pub points: Option<u32>,
    /// Explanation of the correct answer
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Output from the question writer
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QuestionSet {
    pub questions: Vec<QuestionDraft>,
}

pub struct QuestionSkill;

impl QuestionSkill {
    pub fn prompt(request: &RunRequest, research_blob: &str, ctx: &SkillContext) -> Prompt {
        let text = ctx.render_prompt(
            QUESTION_WRITER,
            request,
            &[("research_content", research_blob)],
        );
        Prompt::new(PipelineStage::GeneratingQuestions, text, TEMPERATURE)
    }

    pub async fn run(
        request: &RunRequest,
        research_blob: &str,
        ctx: &SkillContext,
    ) -> Result<Vec<Question>, GenerationFailure> {
        let prompt = Self::prompt(request, research_blob, ctx);
        let set: QuestionSet = generate_structured(ctx.generator.as_ref(), &prompt).await?;

        let unrequested = set
            .questions
            .iter()
            .filter(|q| !request.question_types.contains(&q.question_type))
            .count();
        if unrequested > 0 {
            tracing::warn!(unrequested, "Generator returned question types that were not requested");
        }

        normalize(set.questions)
    }
}

/// Validate drafts and turn them into final questions
pub fn normalize(drafts: Vec<QuestionDraft>) -> Result<Vec<Question>, GenerationFailure> {
    if drafts.is_empty() {
        return Err(GenerationFailure::invalid(SHAPE, "no questions returned"));
    }

    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| normalize_one(index as u32 + 1, draft))
        .collect()
}

fn normalize_one(id: u32, draft: QuestionDraft) -> Result<Question, GenerationFailure> {
    let question_text = draft.question_text.trim().to_string();
    if question_text.is_empty() {
        return Err(GenerationFailure::invalid(
            SHAPE,
            format!("question {} has no text", id),
        ));
    }

    let mut options = draft
        .options
        .map(|opts| {
            opts.into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|opts| !opts.is_empty());
    let mut correct_answer = draft
        .correct_answer
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    if draft.question_type == QuestionType::MultipleChoice {
        let Some(opts) = options.as_mut() else {
            return Err(GenerationFailure::invalid(
                SHAPE,
                format!("multiple choice question {} has no options", id),
            ));
        };
        strip_option_labels(opts);

        if let Some(answer) = correct_answer.take() {
            let resolved = resolve_answer(&answer, opts).ok_or_else(|| {
                GenerationFailure::invalid(
                    SHAPE,
                    format!("answer \"{}\" of question {} matches no option", answer, id),
                )
            })?;
            correct_answer = Some(resolved);
        }
    }

    let points = match draft.points {
        Some(p) if p > 0 => p,
        _ => draft.question_type.default_points(),
    };

    Ok(Question {
        question_id: id,
        question_type: draft.question_type,
        question_text,
        options,
        correct_answer,
        points,
        explanation: draft
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    })
}

/// `B. text`, `B) text`, `(B) text`
static OPTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\(?([A-Ha-h])\s*[\.\)、:：]\s*(.*)$")
        .expect("BUG: invalid OPTION_LABEL regex literal")
});

/// `B`, `B.`, `(B)`
static BARE_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(?([A-Ha-h])\)?\.?$").expect("BUG: invalid BARE_LETTER regex literal")
});

fn letter_index(letter: &str) -> Option<usize> {
    let c = letter.chars().next()?.to_ascii_uppercase();
    Some((c as u8).checked_sub(b'A')? as usize)
}

/// Remove `A.` / `B)` prefixes when every option carries its own label in
/// sequence. The renderer adds labels itself.
fn strip_option_labels(options: &mut [String]) {
    let stripped: Option<Vec<String>> = options
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            let caps = OPTION_LABEL.captures(opt)?;
            (letter_index(&caps[1]) == Some(i)).then(|| caps[2].trim().to_string())
        })
        .collect();

    if let Some(stripped) = stripped {
        if stripped.iter().all(|s| !s.is_empty()) {
            options.clone_from_slice(&stripped);
        }
    }
}

/// Map an answer onto the text of one option
fn resolve_answer(answer: &str, options: &[String]) -> Option<String> {
    if let Some(exact) = options.iter().find(|o| o.as_str() == answer) {
        return Some(exact.clone());
    }
    if let Some(caps) = BARE_LETTER.captures(answer) {
        return letter_index(&caps[1]).and_then(|i| options.get(i)).cloned();
    }
    if let Some(caps) = OPTION_LABEL.captures(answer) {
        let text = caps[2].trim();
        if let Some(matched) = options.iter().find(|o| o.as_str() == text) {
            return Some(matched.clone());
        }
        return letter_index(&caps[1]).and_then(|i| options.get(i)).cloned();
    }
    options
        .iter()
        .find(|o| o.trim().eq_ignore_ascii_case(answer))
        .cloned()
}
