//! Explicit, opt-in retry around a content generator.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{ContentGenerator, Prompt, ResultShape};
use crate::error::GenerationFailure;

/// Retries a failed call up to `max_attempts` times in total
pub struct RetryingGenerator {
    inner: Arc<dyn ContentGenerator>,
    max_attempts: u32,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn ContentGenerator>, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Wrap `inner` only when more than one attempt is configured
    pub fn wrap(inner: Arc<dyn ContentGenerator>, max_attempts: u32) -> Arc<dyn ContentGenerator> {
        if max_attempts > 1 {
            Arc::new(Self::new(inner, max_attempts))
        } else {
            inner
        }
    }
}

#[async_trait]
impl ContentGenerator for RetryingGenerator {
    async fn generate(
        &self,
        prompt: &Prompt,
        shape: &ResultShape,
    ) -> Result<Value, GenerationFailure> {
        let mut attempt = 1;
        loop {
            match self.inner.generate(prompt, shape).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(
                        stage = %prompt.stage,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Generation failed, retrying: {}",
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
