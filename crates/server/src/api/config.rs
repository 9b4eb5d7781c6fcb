//! # Config API
//!
//! Read-only view of the effective pipeline configuration. API keys are
//! never returned; only whether one is present.

use axum::{extract::State, response::Json};
use examforge_core::config::PipelineConfig;
use examforge_core::models::LlmProvider;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::SharedState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    provider: String,
    model: String,
    base_url: String,
    api_key_env: String,
    api_key_set: bool,
    stage_models: HashMap<String, String>,
    language: String,
    output_dir: String,
    request_timeout_secs: u64,
    max_generation_attempts: u32,
    max_concurrent_branches: usize,
}

impl ConfigResponse {
    fn from_config(config: &PipelineConfig, api_key_set: bool) -> Self {
        Self {
            provider: config.model.provider.id().to_string(),
            model: config.model.model.clone(),
            base_url: config.model.base_url().to_string(),
            api_key_env: config.model.api_key_env().to_string(),
            api_key_set,
            stage_models: config.stage_models.clone(),
            language: config.language.clone(),
            output_dir: config.output_dir.display().to_string(),
            request_timeout_secs: config.request_timeout_secs,
            max_generation_attempts: config.attempts(),
            max_concurrent_branches: config.max_concurrent_branches,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    id: String,
    name: String,
    default_model: String,
    default_base_url: String,
    env_var: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvidersResponse {
    providers: Vec<ProviderInfo>,
}

/// Effective configuration, without secrets
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses((status = 200, description = "Effective configuration", body = ConfigResponse))
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let api_key_set = state.config.model.api_key().is_ok();
    Json(ConfigResponse::from_config(&state.config, api_key_set))
}

/// Supported providers
#[utoipa::path(
    get,
    path = "/api/v1/providers",
    tag = "config",
    responses((status = 200, description = "Supported providers", body = ProvidersResponse))
)]
pub async fn get_providers() -> Json<ProvidersResponse> {
    let providers = LlmProvider::all()
        .into_iter()
        .map(|p| ProviderInfo {
            id: p.id().to_string(),
            name: p.display_name().to_string(),
            default_model: p.default_model().to_string(),
            default_base_url: p.default_base_url().to_string(),
            env_var: p.api_key_env().to_string(),
        })
        .collect();
    Json(ProvidersResponse { providers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_response_has_no_key() {
        let response = ConfigResponse::from_config(&PipelineConfig::default(), true);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["provider"], "openai");
        assert_eq!(json["api_key_env"], "OPENAI_API_KEY");
        assert_eq!(json["api_key_set"], true);
        assert_eq!(json["output_dir"], "generated_exams");
        assert!(json.get("api_key").is_none());
    }

    #[tokio::test]
    async fn test_providers_listed() {
        let Json(response) = get_providers().await;
        let ids: Vec<&str> = response.providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["openai", "openrouter", "deepseek", "grok"]);
    }
}
