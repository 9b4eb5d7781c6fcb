//! # Exam Pipeline
//!
//! Drives a run through its stages and reports progress.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Initializing → PlanTopics → ResearchTopic ×N → ComposeQuestions → ComposeMetadata
//!              → ComposeNotes → RenderDocuments → Completed
//! ```
//!
//! Any stage may end the run in `Failed`.

pub mod channel;
pub mod coordinator;
pub mod events;
pub mod fan_out;
pub mod stage;

pub use channel::{Disconnected, ProgressChannel};
pub use coordinator::{Coordinator, RunHandle, RunReport, StartMode, EVENT_BUFFER};
pub use events::{Progress, ProgressEvent};
pub use fan_out::{BranchOutcome, FanOut};
pub use stage::{Pipeline, PipelineStage};
