//! # Examforge Core
//!
//! Exam generation pipeline: plans research topics for a knowledge topic,
//! researches them in parallel, writes questions, exam metadata and study
//! notes, and renders the exam, answer key and notes documents.
//!
//! ## Architecture
//!
//! - `pipeline/` - Stage machine, coordinator, research fan-out, progress channel
//! - `skills/` - One skill per stage, plus the prompt templates
//! - `generator/` - Content generator boundary and the OpenAI-compatible adapter
//! - `render/` - Document renderers and the artifact store
//! - `state/` - Request, run state and result types
//! - `models` / `config` - Provider and pipeline configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use examforge_core::config::PipelineConfig;
//! use examforge_core::pipeline::Coordinator;
//! use examforge_core::state::RunRequest;
//!
//! let config = PipelineConfig::load().await?;
//! let coordinator = Coordinator::from_config(&config)?;
//! let report = coordinator.run(RunRequest::new("photosynthesis")).await;
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod skills;
pub mod state;

#[cfg(test)]
mod testing;
