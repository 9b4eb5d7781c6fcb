//! # Exam API
//!
//! Synchronous and streaming generation triggers. The streaming endpoint
//! forwards every progress event as one SSE `data:` frame; dropping the
//! connection cancels the run.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use examforge_core::state::{Difficulty, EducationLevel, QuestionType, RunRequest};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use super::{ApiError, ErrorBody};
use crate::SharedState;

/// Generation request. Omitted fields take the pipeline defaults.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateExamRequest {
    /// Knowledge topic to examine
    #[serde(alias = "topic")]
    pub knowledge_topic: String,
    /// primary, middle or high
    #[schema(value_type = Option<String>, example = "middle")]
    pub education_level: Option<EducationLevel>,
    /// Subject code, e.g. math or biology
    pub subject: Option<String>,
    /// easy, medium or hard
    #[serde(alias = "difficulty")]
    #[schema(value_type = Option<String>, example = "medium")]
    pub difficulty_level: Option<Difficulty>,
    /// 1 to 100
    pub question_count: Option<u32>,
    /// Question type wire names
    #[schema(value_type = Option<Vec<String>>, example = json!(["multiple_choice", "short_answer"]))]
    pub question_types: Option<Vec<QuestionType>>,
}

impl From<GenerateExamRequest> for RunRequest {
    fn from(body: GenerateExamRequest) -> Self {
        let mut request = RunRequest::new(body.knowledge_topic);
        if let Some(level) = body.education_level {
            request = request.with_education_level(level);
        }
        if let Some(subject) = body.subject {
            request = request.with_subject(subject);
        }
        if let Some(difficulty) = body.difficulty_level {
            request = request.with_difficulty(difficulty);
        }
        if let Some(count) = body.question_count {
            request = request.with_question_count(count);
        }
        if let Some(types) = body.question_types {
            request = request.with_question_types(types);
        }
        request
    }
}

/// Generate an exam and wait for the result
#[utoipa::path(
    post,
    path = "/generate-exam",
    tag = "exam",
    request_body = GenerateExamRequest,
    responses(
        (status = 200, description = "Generated exam, answer key and study notes"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "A stage failed", body = ErrorBody)
    )
)]
pub async fn generate_exam(
    State(state): State<SharedState>,
    Json(body): Json<GenerateExamRequest>,
) -> Result<Response, ApiError> {
    let report = state.coordinator.run(body.into()).await;
    let result = report.result?;
    Ok(Json(result).into_response())
}

/// Generate an exam, streaming progress events
#[utoipa::path(
    post,
    path = "/generate-exam-stream",
    tag = "exam",
    request_body = GenerateExamRequest,
    responses(
        (status = 200, description = "Server-sent progress events; the last one is `completed` or `error`")
    )
)]
pub async fn generate_exam_stream(
    State(state): State<SharedState>,
    Json(body): Json<GenerateExamRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.coordinator.start_streaming(body.into());

    let stream = ReceiverStream::new(rx).map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
