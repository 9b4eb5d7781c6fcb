//! # Pipeline Configuration
//!
//! Layered configuration: built-in defaults, then an optional JSON file
//! (`.examforge/config.json`, or the path in `EXAMFORGE_CONFIG`), then
//! environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::{LlmProvider, ModelConfig};
use crate::pipeline::PipelineStage;

pub const DEFAULT_CONFIG_PATH: &str = ".examforge/config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model used by every stage without an override
    pub model: ModelConfig,
    /// Per-stage model overrides (stage wire name -> model name)
    pub stage_models: HashMap<String, String>,
    /// Language generated content is written in
    pub language: String,
    /// Directory rendered documents are written to
    pub output_dir: PathBuf,
    /// Generator request timeout in seconds
    pub request_timeout_secs: u64,
    /// Attempts per generator call (1 = no retry)
    pub max_generation_attempts: u32,
    /// Research branches allowed in flight at once (0 = unbounded)
    pub max_concurrent_branches: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            stage_models: HashMap::new(),
            language: "Simplified Chinese".to_string(),
            output_dir: PathBuf::from("generated_exams"),
            request_timeout_secs: 120,
            max_generation_attempts: 1,
            max_concurrent_branches: 0,
        }
    }
}

impl PipelineConfig {
    /// Load defaults, the config file and the process environment
    pub async fn load() -> Result<Self> {
        let path = std::env::var("EXAMFORGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay environment values, read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.model.provider == LlmProvider::OpenAI {
            if let Some(url) = lookup("OPENAI_BASE_URL") {
                self.model.base_url = Some(url);
            }
            if let Some(model) = lookup("OPENAI_MODEL") {
                self.model.model = model;
            }
        }
        if let Some(dir) = lookup("EXAMFORGE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(language) = lookup("EXAMFORGE_LANGUAGE") {
            self.language = language;
        }
        if let Some(attempts) = lookup("EXAMFORGE_MAX_ATTEMPTS") {
            self.max_generation_attempts = attempts
                .trim()
                .parse()
                .with_context(|| format!("EXAMFORGE_MAX_ATTEMPTS is not a number: {}", attempts))?;
        }
        Ok(())
    }

    /// Attempts per generator call, never below 1
    pub fn attempts(&self) -> u32 {
        self.max_generation_attempts.max(1)
    }

    /// Model configuration for a stage, with its override applied
    pub fn model_for(&self, stage: PipelineStage) -> ModelConfig {
        let mut config = self.model.clone();
        if let Some(model) = self.stage_models.get(stage.wire_name()) {
            config.model = model.clone();
        }
        config
    }
}
