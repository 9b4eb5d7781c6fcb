//! OpenAI-compatible chat-completions adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{ContentGenerator, Prompt, ResultShape};
use crate::config::PipelineConfig;
use crate::error::GenerationFailure;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Calls `{base_url}/chat/completions` with the stage's model
pub struct OpenAiCompatibleGenerator {
    client: reqwest::Client,
    config: PipelineConfig,
    api_key: String,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: PipelineConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("examforge/0.1")
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Build from config, reading the API key from the provider's variable.
    /// A missing key is allowed for local endpoints.
    pub fn from_config(config: &PipelineConfig) -> anyhow::Result<Self> {
        let api_key = match config.model.api_key() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("{}; requests will be sent without authorization", e);
                String::new()
            }
        };
        Self::new(config.clone(), api_key)
    }

    fn request_body<'a>(
        &self,
        model: &'a str,
        prompt: &'a Prompt,
        shape: &ResultShape,
        instructions: &'a str,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        let response_format = match shape {
            ResultShape::Text => None,
            ResultShape::Structured { name, schema } => {
                messages.push(ChatMessage {
                    role: "system",
                    content: instructions,
                });
                if self.config.model.provider.supports_json_schema() {
                    Some(json!({
                        "type": "json_schema",
                        "json_schema": {
                            "name": schema_identifier(name),
                            "schema": schema,
                        }
                    }))
                } else {
                    Some(json!({ "type": "json_object" }))
                }
            }
        };
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.text,
        });

        ChatRequest {
            model,
            temperature: prompt.temperature,
            messages,
            response_format,
        }
    }
}

#[async_trait]
impl ContentGenerator for OpenAiCompatibleGenerator {
    async fn generate(
        &self,
        prompt: &Prompt,
        shape: &ResultShape,
    ) -> Result<Value, GenerationFailure> {
        let model = self.config.model_for(prompt.stage);
        let instructions = match shape {
            ResultShape::Text => String::new(),
            ResultShape::Structured { name, schema } => format!(
                "Respond with a single JSON object for `{}` and nothing else. JSON schema:\n{}",
                name, schema
            ),
        };
        let body = self.request_body(&model.model, prompt, shape, &instructions);
        let url = format!("{}/chat/completions", model.base_url());

        tracing::debug!(stage = %prompt.stage, model = %model.model, shape = shape.name(), "Generator request");

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| self.transport_failure(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationFailure::Rejected {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_failure(e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationFailure::invalid(shape.name(), "response has no content"))?;

        match shape {
            ResultShape::Text => Ok(Value::String(content)),
            ResultShape::Structured { name, .. } => serde_json::from_str(strip_code_fences(&content))
                .map_err(|e| GenerationFailure::invalid(name.as_str(), format!("not JSON: {}", e))),
        }
    }
}

impl OpenAiCompatibleGenerator {
    fn transport_failure(&self, err: reqwest::Error) -> GenerationFailure {
        if err.is_timeout() {
            GenerationFailure::Timeout(self.config.request_timeout_secs)
        } else {
            GenerationFailure::Unreachable(err.to_string())
        }
    }
}

/// Remove a surrounding markdown code fence, if any
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        // Drop the language tag line
        Some((_, body)) => body,
        // Fence opened and closed on one line
        None => rest.strip_prefix("json").unwrap_or(rest),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// `json_schema.name` only allows `[a-zA-Z0-9_-]`
fn schema_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LlmProvider, ModelConfig};
    use crate::pipeline::PipelineStage;

    fn generator(provider: LlmProvider) -> OpenAiCompatibleGenerator {
        let config = PipelineConfig {
            model: ModelConfig::with_provider(provider, provider.default_model()),
            ..PipelineConfig::default()
        };
        OpenAiCompatibleGenerator::new(config, "sk-test").unwrap()
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n[1, 2]\n```  "), "[1, 2]");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json {\"a\":1} ```"), "{\"a\":1}");
    }

    #[test]
    fn test_schema_identifier() {
        assert_eq!(schema_identifier("Vec<String>"), "Vec_String_");
        assert_eq!(schema_identifier("TopicPlan"), "TopicPlan");
    }

    #[test]
    fn test_structured_request_uses_json_schema() {
        let generator = generator(LlmProvider::OpenAI);
        let prompt = Prompt::new(PipelineStage::PlanningTopics, "plan topics", 0.7);
        let shape = ResultShape::Structured {
            name: "TopicPlan".into(),
            schema: json!({"type": "object"}),
        };
        let body = serde_json::to_value(generator.request_body("gpt-4o", &prompt, &shape, "json"))
            .unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "TopicPlan");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "plan topics");
    }

    #[test]
    fn test_text_request_has_no_response_format() {
        let generator = generator(LlmProvider::OpenAI);
        let prompt = Prompt::new(PipelineStage::ResearchingKnowledge, "research", 0.3);
        let body =
            serde_json::to_value(generator.request_body("gpt-4o", &prompt, &ResultShape::Text, ""))
                .unwrap();

        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_deepseek_falls_back_to_json_object() {
        let generator = generator(LlmProvider::DeepSeek);
        let prompt = Prompt::new(PipelineStage::GeneratingNotes, "notes", 0.3);
        let shape = ResultShape::Structured {
            name: "StudyNotes".into(),
            schema: json!({"type": "object"}),
        };
        let body = serde_json::to_value(generator.request_body("deepseek-chat", &prompt, &shape, "json"))
            .unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
    }
}
