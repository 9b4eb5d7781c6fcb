//! # Document Rendering
//!
//! The renderer contract and the shipped Markdown renderer. Renderers are
//! synchronous and do blocking file I/O; the pipeline calls them from a
//! blocking worker.

pub mod artifacts;
pub mod markdown;

use std::path::Path;

use crate::error::RenderFailure;
use crate::state::{Difficulty, EducationLevel, Question, StudyNotes};

pub use artifacts::{safe_filename, ArtifactInfo, ArtifactKind, ArtifactSet, ArtifactStore};
pub use markdown::MarkdownRenderer;

/// Everything printed on an exam paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDocument {
    pub title: String,
    pub instructions: String,
    pub questions: Vec<Question>,
    pub total_points: u32,
    pub time_limit: String,
}

/// Header fields of the study notes document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesHeader {
    pub topic: String,
    pub subject: String,
    pub education_level: EducationLevel,
    pub difficulty: Difficulty,
}

/// Produces document files
pub trait DocumentRenderer: Send + Sync {
    /// File extension of produced documents, without the dot
    fn extension(&self) -> &'static str;

    /// Write an exam paper to `path`; with `include_answers` it becomes the
    /// answer key
    fn render_exam(
        &self,
        exam: &ExamDocument,
        include_answers: bool,
        path: &Path,
    ) -> Result<(), RenderFailure>;

    fn render_notes(
        &self,
        notes: &StudyNotes,
        header: &NotesHeader,
        path: &Path,
    ) -> Result<(), RenderFailure>;
}
