//! Request handlers

use crate::AppState;
use crate::error::{ApiError, ErrorResponse};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State, multipart::MultipartRejection};
use finai_analysis::{AnalysisRequest, AnalysisResult};
use serde::Serialize;
use tracing::{info, instrument};

pub const UPLOAD_FIELD: &str = "file";

/// Body of a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub path: String,
}

/// `POST /api/analyze`
#[instrument(skip_all)]
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ErrorResponse> {
    let Json(request) = body.map_err(|e| state.reject(e))?;
    info!(
        segment = ?request.segment,
        kpis = ?request.kpis,
        "analysis requested"
    );

    let result = state
        .analyzer
        .analyze(request)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(result))
}

/// `POST /api/upload`
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ErrorResponse> {
    let mut multipart = multipart.map_err(|_| state.reject(ApiError::MissingFile))?;

    let (file_name, contents) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| state.reject(e))?
            .ok_or_else(|| state.reject(ApiError::MissingFile))?;
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(sanitize_file_name)
            .ok_or_else(|| state.reject(ApiError::EmptyFileName))?;
        let contents = field.bytes().await.map_err(|e| state.reject(e))?;
        break (file_name, contents);
    };

    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| state.reject(ApiError::Storage(e)))?;
    let path = state.config.upload_path(&file_name);
    tokio::fs::write(&path, &contents)
        .await
        .map_err(|e| state.reject(ApiError::Storage(e)))?;

    info!(file = %file_name, bytes = contents.len(), "file uploaded");
    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully".to_string(),
        filename: file_name,
        path: path.display().to_string(),
    }))
}

/// Final path component of a client-supplied name
fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}
