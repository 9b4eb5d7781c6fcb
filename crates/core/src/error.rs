//! # Errors
//!
//! Failure taxonomy for a run. Generation failures are raised by the content
//! generator adapter; the coordinator wraps them into branch and stage
//! failures. Every stage failure ends the run in `Failed`.

use thiserror::Error;

use crate::pipeline::PipelineStage;

/// The content generator could not produce or validate a result
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("content generator unreachable: {0}")]
    Unreachable(String),
    #[error("content generator timed out after {0}s")]
    Timeout(u64),
    #[error("content generator rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("output does not match `{shape}`: {reason}")]
    InvalidOutput { shape: String, reason: String },
}

impl GenerationFailure {
    /// Build an `InvalidOutput` failure for a named result shape
    pub fn invalid(shape: impl Into<String>, reason: impl Into<String>) -> Self {
        GenerationFailure::InvalidOutput {
            shape: shape.into(),
            reason: reason.into(),
        }
    }
}

/// A generation failure inside one research branch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("research branch {branch_index} ({topic}) failed: {source}")]
pub struct BranchFailure {
    pub branch_index: usize,
    pub topic: String,
    pub source: GenerationFailure,
}

/// Document production failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderFailure {
    #[error("failed to write {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("run state is missing {0}")]
    MissingInput(&'static str),
    #[error("render task aborted: {0}")]
    Aborted(String),
}

impl RenderFailure {
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        RenderFailure::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// A stage tried to set a field an earlier stage already owns
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{field}` was already set earlier in the run")]
pub struct StateConflict {
    pub field: &'static str,
}

/// Underlying cause of a stage failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FailureCause {
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error(transparent)]
    Branch(#[from] BranchFailure),
    #[error(transparent)]
    Render(#[from] RenderFailure),
    #[error(transparent)]
    State(#[from] StateConflict),
    #[error("{0}")]
    Internal(String),
}

/// Terminal failure of one stage, carrying the stage and its cause
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("stage `{stage}` failed: {cause}")]
pub struct StageFailure {
    pub stage: PipelineStage,
    #[source]
    pub cause: FailureCause,
}

impl StageFailure {
    pub fn new(stage: PipelineStage, cause: impl Into<FailureCause>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// The request was rejected before any stage ran
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("knowledge topic must not be blank")]
    EmptyTopic,
    #[error("question count must be between 1 and {max}, got {count}")]
    QuestionCount { count: u32, max: u32 },
    #[error("at least one question type is required")]
    NoQuestionTypes,
}

/// Why a run did not reach `Completed`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunFailure {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),
    #[error(transparent)]
    Stage(#[from] StageFailure),
    #[error("run cancelled by the caller")]
    Cancelled,
}

impl RunFailure {
    /// Stage the run was in when it failed, if a stage was running
    pub fn stage(&self) -> PipelineStage {
        match self {
            RunFailure::Stage(failure) => failure.stage,
            RunFailure::InvalidRequest(_) | RunFailure::Cancelled => PipelineStage::Initializing,
        }
    }
}
