//! # Run State
//!
//! The single aggregate threaded through a run. Only the coordinator owns it;
//! stages read it and hand back a [`PartialUpdate`], which is merged with
//! set-once semantics: a field an earlier stage populated is never touched
//! again.

use serde::Serialize;
use std::path::PathBuf;

use super::notes::StudyNotes;
use super::question::Question;
use super::request::{Difficulty, RunRequest};
use crate::error::StateConflict;

/// Input of one research branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchBranch {
    /// Correlates progress messages; not used for ordering results
    pub branch_index: usize,
    pub topic: String,
    pub parent_topic: String,
    pub difficulty: Difficulty,
}

/// Output of one research branch, tagged with the branch it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchFinding {
    pub branch_index: usize,
    pub topic: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamMetadata {
    pub title: String,
    pub instructions: String,
    pub total_points: u32,
    pub time_limit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPaths {
    pub exam_path: PathBuf,
    pub answer_key_path: PathBuf,
    pub notes_path: PathBuf,
}

/// The subset of run state one stage is allowed to set
#[derive(Debug, Clone, PartialEq)]
pub enum PartialUpdate {
    Topics(Vec<String>),
    Finding(ResearchFinding),
    Questions(Vec<Question>),
    Metadata(ExamMetadata),
    Notes(StudyNotes),
    Rendered(RenderedPaths),
}

/// Separator between findings in the research blob
pub const FINDINGS_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    request: RunRequest,
    topics: Option<Vec<String>>,
    /// Completion order, not topic order
    findings: Vec<ResearchFinding>,
    questions: Option<Vec<Question>>,
    metadata: Option<ExamMetadata>,
    study_notes: Option<StudyNotes>,
    rendered: Option<RenderedPaths>,
}

impl RunState {
    pub fn new(request: RunRequest) -> Self {
        Self {
            request,
            topics: None,
            findings: Vec::new(),
            questions: None,
            metadata: None,
            study_notes: None,
            rendered: None,
        }
    }

    /// Merge a stage output into the state
    pub fn apply(&mut self, update: PartialUpdate) -> Result<(), StateConflict> {
        match update {
            PartialUpdate::Topics(topics) => set_once(&mut self.topics, topics, "topics"),
            PartialUpdate::Finding(finding) => {
                let duplicate = self
                    .findings
                    .iter()
                    .any(|f| f.branch_index == finding.branch_index);
                if duplicate || self.questions.is_some() {
                    return Err(StateConflict {
                        field: "research_findings",
                    });
                }
                self.findings.push(finding);
                Ok(())
            }
            PartialUpdate::Questions(questions) => {
                set_once(&mut self.questions, questions, "questions")
            }
            PartialUpdate::Metadata(metadata) => {
                set_once(&mut self.metadata, metadata, "exam_metadata")
            }
            PartialUpdate::Notes(notes) => set_once(&mut self.study_notes, notes, "study_notes"),
            PartialUpdate::Rendered(paths) => set_once(&mut self.rendered, paths, "rendered_paths"),
        }
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn topics(&self) -> &[String] {
        self.topics.as_deref().unwrap_or(&[])
    }

    pub fn findings(&self) -> &[ResearchFinding] {
        &self.findings
    }

    /// All findings joined into one context blob, in completion order
    pub fn findings_blob(&self) -> String {
        self.findings
            .iter()
            .map(|f| f.content.as_str())
            .collect::<Vec<_>>()
            .join(FINDINGS_SEPARATOR)
    }

    pub fn questions(&self) -> &[Question] {
        self.questions.as_deref().unwrap_or(&[])
    }

    pub fn metadata(&self) -> Option<&ExamMetadata> {
        self.metadata.as_ref()
    }

    pub fn study_notes(&self) -> Option<&StudyNotes> {
        self.study_notes.as_ref()
    }

    pub fn rendered(&self) -> Option<&RenderedPaths> {
        self.rendered.as_ref()
    }

    /// Final payload of a completed run. `None` until every field is set.
    pub fn into_result(self) -> Option<RunResult> {
        let metadata = self.metadata?;
        let rendered = self.rendered?;
        Some(RunResult {
            success: true,
            exam_title: metadata.title,
            exam_instructions: metadata.instructions,
            questions: self.questions?,
            total_points: metadata.total_points,
            time_limit: metadata.time_limit,
            exam_path: rendered.exam_path.display().to_string(),
            answer_key_path: rendered.answer_key_path.display().to_string(),
            notes_path: rendered.notes_path.display().to_string(),
            study_notes: self.study_notes?,
            topics: self.topics.unwrap_or_default(),
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, field: &'static str) -> Result<(), StateConflict> {
    if slot.is_some() {
        return Err(StateConflict { field });
    }
    *slot = Some(value);
    Ok(())
}

/// Final result of a completed run
///
/// `exam_path` keeps the `pdf_path` key existing clients read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub success: bool,
    pub exam_title: String,
    pub exam_instructions: String,
    pub questions: Vec<Question>,
    pub total_points: u32,
    pub time_limit: String,
    #[serde(rename = "pdf_path")]
    pub exam_path: String,
    pub answer_key_path: String,
    pub notes_path: String,
    pub study_notes: StudyNotes,
    pub topics: Vec<String>,
}
