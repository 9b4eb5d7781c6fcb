//! # Pipeline Stages
//!
//! Defines the stages of the exam generation pipeline and the state machine
//! that walks them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of the pipeline
///
/// Serialized with the step names stream consumers already key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Validating the request and preparing the run
    #[serde(rename = "initializing")]
    Initializing,
    /// Planning the research topics to fan out over
    #[serde(rename = "research_topics")]
    PlanningTopics,
    /// Researching every planned topic in parallel
    #[serde(rename = "research_knowledge")]
    ResearchingKnowledge,
    /// Writing the exam questions
    #[serde(rename = "generate_questions")]
    GeneratingQuestions,
    /// Writing title, instructions and time limit
    #[serde(rename = "compile_metadata")]
    CompilingMetadata,
    /// Writing the study notes
    #[serde(rename = "generate_notes")]
    GeneratingNotes,
    /// Producing the exam, answer key and notes documents
    #[serde(rename = "generate_pdf")]
    RenderingDocuments,
    /// Complete
    #[serde(rename = "completed")]
    Completed,
    /// Failed
    #[serde(rename = "error")]
    Failed,
}

impl PipelineStage {
    /// All stages in run order, terminals last
    pub fn all() -> [PipelineStage; 9] {
        [
            PipelineStage::Initializing,
            PipelineStage::PlanningTopics,
            PipelineStage::ResearchingKnowledge,
            PipelineStage::GeneratingQuestions,
            PipelineStage::CompilingMetadata,
            PipelineStage::GeneratingNotes,
            PipelineStage::RenderingDocuments,
            PipelineStage::Completed,
            PipelineStage::Failed,
        ]
    }

    /// Step name used on the progress wire and in per-stage config keys
    pub fn wire_name(&self) -> &'static str {
        match self {
            PipelineStage::Initializing => "initializing",
            PipelineStage::PlanningTopics => "research_topics",
            PipelineStage::ResearchingKnowledge => "research_knowledge",
            PipelineStage::GeneratingQuestions => "generate_questions",
            PipelineStage::CompilingMetadata => "compile_metadata",
            PipelineStage::GeneratingNotes => "generate_notes",
            PipelineStage::RenderingDocuments => "generate_pdf",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "error",
        }
    }

    /// Parse a wire name back into a stage
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.wire_name() == name)
    }

    /// Successor on success. Terminal stages map to themselves.
    pub fn next(&self) -> PipelineStage {
        match self {
            PipelineStage::Initializing => PipelineStage::PlanningTopics,
            PipelineStage::PlanningTopics => PipelineStage::ResearchingKnowledge,
            PipelineStage::ResearchingKnowledge => PipelineStage::GeneratingQuestions,
            PipelineStage::GeneratingQuestions => PipelineStage::CompilingMetadata,
            PipelineStage::CompilingMetadata => PipelineStage::GeneratingNotes,
            PipelineStage::GeneratingNotes => PipelineStage::RenderingDocuments,
            PipelineStage::RenderingDocuments => PipelineStage::Completed,
            PipelineStage::Completed => PipelineStage::Completed,
            PipelineStage::Failed => PipelineStage::Failed,
        }
    }

    /// Whether the stage ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }

    /// Run-level progress reported when the stage starts and when it finishes.
    ///
    /// Boundaries never decrease along the success path. `Failed` has no span
    /// of its own; the error event repeats the last reported value.
    pub fn progress_span(&self) -> (f64, f64) {
        match self {
            PipelineStage::Initializing => (5.0, 5.0),
            PipelineStage::PlanningTopics => (15.0, 25.0),
            PipelineStage::ResearchingKnowledge => (35.0, 50.0),
            PipelineStage::GeneratingQuestions => (55.0, 70.0),
            PipelineStage::CompilingMetadata => (70.0, 75.0),
            PipelineStage::GeneratingNotes => (80.0, 85.0),
            PipelineStage::RenderingDocuments => (90.0, 90.0),
            PipelineStage::Completed => (100.0, 100.0),
            PipelineStage::Failed => (0.0, 0.0),
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// The pipeline state machine
///
/// Each non-terminal stage has exactly one successor; `Failed` is reachable
/// from all of them. No stage is revisited.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Current stage
    pub stage: PipelineStage,
    /// Stage that was active when the run failed
    pub failed_at: Option<PipelineStage>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Initializing,
            failed_at: None,
        }
    }
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next stage and return it
    pub fn advance(&mut self) -> PipelineStage {
        self.stage = self.stage.next();
        self.stage
    }

    /// Fail the pipeline, remembering where. Returns the failed stage.
    ///
    /// Failing an already-terminal pipeline is a no-op.
    pub fn fail(&mut self) -> PipelineStage {
        if !self.stage.is_terminal() {
            self.failed_at = Some(self.stage);
            self.stage = PipelineStage::Failed;
        }
        self.failed_at.unwrap_or(self.stage)
    }

    /// Check if pipeline is complete
    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Check if pipeline succeeded
    pub fn is_success(&self) -> bool {
        self.stage == PipelineStage::Completed
    }
}
