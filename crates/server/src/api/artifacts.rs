//! # Artifact API
//!
//! Listing, download and inline preview of generated documents.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use examforge_core::render::ArtifactInfo;
use serde::Serialize;
use utoipa::ToSchema;

use super::{ApiError, ErrorBody};
use crate::SharedState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExamFile {
    pub filename: String,
    pub size: u64,
    /// RFC 3339 creation time
    pub created: String,
    /// exam, answer_key, notes or other
    pub kind: String,
}

impl From<ArtifactInfo> for ExamFile {
    fn from(info: ArtifactInfo) -> Self {
        let kind = serde_json::to_value(info.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "other".to_string());
        Self {
            filename: info.filename,
            size: info.size,
            created: info.created.to_rfc3339(),
            kind,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExamListResponse {
    pub exams: Vec<ExamFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

/// Generated documents, newest first
#[utoipa::path(
    get,
    path = "/list-exams",
    tag = "artifacts",
    responses(
        (status = 200, description = "Generated documents", body = ExamListResponse),
        (status = 500, description = "Output directory unreadable", body = ErrorBody)
    )
)]
pub async fn list_exams(State(state): State<SharedState>) -> Result<Json<ExamListResponse>, ApiError> {
    let artifacts = state
        .coordinator
        .store()
        .list()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list exams: {:#}", e)))?;

    Ok(Json(ExamListResponse {
        exams: artifacts.into_iter().map(ExamFile::from).collect(),
    }))
}

/// Download a generated document
#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "artifacts",
    params(("filename" = String, Path, description = "Artifact file name")),
    responses(
        (status = 200, description = "File contents as an attachment"),
        (status = 404, description = "No such artifact", body = ErrorBody)
    )
)]
pub async fn download(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_artifact(&state, &filename, Disposition::Attachment).await
}

/// View a generated document inline
#[utoipa::path(
    get,
    path = "/preview/{filename}",
    tag = "artifacts",
    params(("filename" = String, Path, description = "Artifact file name")),
    responses(
        (status = 200, description = "File contents for inline display"),
        (status = 404, description = "No such artifact", body = ErrorBody)
    )
)]
pub async fn preview(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_artifact(&state, &filename, Disposition::Inline).await
}

async fn serve_artifact(
    state: &SharedState,
    filename: &str,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let path = state
        .coordinator
        .store()
        .resolve(filename)
        .ok_or_else(|| ApiError::not_found(format!("File not found: {}", filename)))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!("File not found: {}", filename)))
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to read {}: {}", filename, e))),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(filename, disposition)),
        (header::CACHE_CONTROL, "no-cache".to_string()),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

fn content_disposition(filename: &str, disposition: Disposition) -> String {
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    format!("{}; filename=\"{}\"", kind, filename.replace('"', ""))
}
