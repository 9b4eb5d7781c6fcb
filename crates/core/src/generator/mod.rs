//! # Content Generator
//!
//! Boundary to the external text/JSON generation capability. Adapters return
//! raw JSON; the typed helpers here decode it strictly, so anything that does
//! not match the declared shape surfaces as
//! [`GenerationFailure::InvalidOutput`].
//!
//! No retries happen here. Wrap an adapter in [`RetryingGenerator`] to opt in.

pub mod openai;
pub mod retry;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GenerationFailure;
use crate::pipeline::PipelineStage;

pub use openai::OpenAiCompatibleGenerator;
pub use retry::RetryingGenerator;

/// A fully formatted prompt for one stage call
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Stage issuing the call; selects model overrides
    pub stage: PipelineStage,
    pub text: String,
    pub temperature: f32,
}

impl Prompt {
    pub fn new(stage: PipelineStage, text: impl Into<String>, temperature: f32) -> Self {
        Self {
            stage,
            text: text.into(),
            temperature,
        }
    }
}

/// Expected shape of a generator result
#[derive(Debug, Clone, PartialEq)]
pub enum ResultShape {
    /// Free text, returned as a JSON string
    Text,
    /// A JSON object matching `schema`
    Structured { name: String, schema: Value },
}

impl ResultShape {
    /// Structured shape derived from a Rust type
    pub fn of<T: JsonSchema>() -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
        ResultShape::Structured {
            name: T::schema_name().to_string(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResultShape::Text => "text",
            ResultShape::Structured { name, .. } => name,
        }
    }
}

/// Produces content for a prompt in the requested shape
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt, shape: &ResultShape)
        -> Result<Value, GenerationFailure>;
}

/// Generate and decode a structured result
pub async fn generate_structured<T>(
    generator: &dyn ContentGenerator,
    prompt: &Prompt,
) -> Result<T, GenerationFailure>
where
    T: DeserializeOwned + JsonSchema,
{
    let shape = ResultShape::of::<T>();
    let value = generator.generate(prompt, &shape).await?;
    serde_json::from_value(value).map_err(|e| GenerationFailure::invalid(shape.name(), e.to_string()))
}

/// Generate free text. Blank output is rejected.
pub async fn generate_text(
    generator: &dyn ContentGenerator,
    prompt: &Prompt,
) -> Result<String, GenerationFailure> {
    match generator.generate(prompt, &ResultShape::Text).await? {
        Value::String(text) if !text.trim().is_empty() => Ok(text),
        Value::String(_) => Err(GenerationFailure::invalid("text", "empty response")),
        other => Err(GenerationFailure::invalid(
            "text",
            format!("expected a string, got {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
