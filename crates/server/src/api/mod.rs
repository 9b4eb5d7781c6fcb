//! # HTTP API
//!
//! Routes, the shared error body and the OpenAPI document.

pub mod artifacts;
pub mod config;
pub mod exam;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use examforge_core::error::RunFailure;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::SharedState;

/// Body of every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    /// Stage wire name the failure belongs to, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                success: false,
                step: None,
                message: message.into(),
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                success: false,
                step: None,
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RunFailure> for ApiError {
    fn from(failure: RunFailure) -> Self {
        let status = match failure {
            RunFailure::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RunFailure::Stage(_) | RunFailure::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorBody {
                success: false,
                step: Some(failure.stage().wire_name().to_string()),
                message: failure.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Examforge API",
        version = "1.0.0",
        description = "Generate exams, answer keys and study notes from a knowledge topic"
    ),
    paths(
        health,
        exam::generate_exam,
        exam::generate_exam_stream,
        artifacts::list_exams,
        artifacts::download,
        artifacts::preview,
        config::get_config,
        config::get_providers
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            exam::GenerateExamRequest,
            artifacts::ExamFile,
            artifacts::ExamListResponse,
            config::ConfigResponse,
            config::ProviderInfo,
            config::ProvidersResponse
        )
    ),
    tags(
        (name = "exam", description = "Exam generation"),
        (name = "artifacts", description = "Generated documents"),
        (name = "config", description = "Configuration"),
        (name = "system", description = "Health and metadata")
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> Response {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => ([(header::CONTENT_TYPE, "application/json")], spec).into_response(),
        Err(e) => ApiError::internal(format!("Failed to render OpenAPI document: {}", e))
            .into_response(),
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-exam", post(exam::generate_exam))
        .route("/generate-exam-stream", post(exam::generate_exam_stream))
        .route("/list-exams", get(artifacts::list_exams))
        .route("/download/:filename", get(artifacts::download))
        .route("/preview/:filename", get(artifacts::preview))
        .route("/api/v1/config", get(config::get_config))
        .route("/api/v1/providers", get(config::get_providers))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::error::{GenerationFailure, InvalidRequest, StageFailure};
    use examforge_core::pipeline::PipelineStage;

    #[test]
    fn test_invalid_request_maps_to_bad_request() {
        let error = ApiError::from(RunFailure::InvalidRequest(InvalidRequest::EmptyTopic));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.body.step.as_deref(), Some("initializing"));
    }

    #[test]
    fn test_stage_failure_names_step() {
        let failure = RunFailure::Stage(StageFailure::new(
            PipelineStage::GeneratingQuestions,
            GenerationFailure::Timeout(120),
        ));
        let error = ApiError::from(failure);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.body.step.as_deref(), Some("generate_questions"));
        assert!(!error.body.success);
    }

    #[test]
    fn test_openapi_lists_routes() {
        let json = ApiDoc::openapi().to_json().unwrap();
        for path in ["/generate-exam", "/generate-exam-stream", "/list-exams", "/download/{filename}"] {
            assert!(json.contains(path), "missing {}", path);
        }
    }
}
