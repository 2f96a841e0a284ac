//! HTTP error envelope

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use finai_analysis::AnalysisError;
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload request without a `file` part
    #[error("No file part")]
    MissingFile,

    /// `file` part with an empty or unusable file name
    #[error("No selected file")]
    EmptyFileName,

    /// Multipart stream could not be read
    #[error("Error uploading file: {0}")]
    Multipart(#[from] MultipartError),

    /// Upload could not be stored
    #[error("Error uploading file: {0}")]
    Storage(#[source] std::io::Error),

    /// Request body is not a valid analysis request
    #[error("Error processing request: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Error processing request: {0}")]
    Analysis(#[from] AnalysisError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::EmptyFileName | Self::Multipart(_) | Self::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Storage(_) | Self::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach the error chain to the response body when `expose` is set
    pub fn with_details(self, expose: bool) -> ErrorResponse {
        ErrorResponse {
            error: self,
            expose_details: expose,
        }
    }
}

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

/// [`ApiError`] together with the exposure setting of the server
#[derive(Debug)]
pub struct ErrorResponse {
    error: ApiError,
    expose_details: bool,
}

impl ErrorResponse {
    pub fn error(&self) -> &ApiError {
        &self.error
    }
}

/// Error message followed by its sources, one per line
///
/// A source whose text already ends the previous message is folded into it.
pub fn error_chain(err: &dyn StdError) -> String {
    let messages: Vec<String> = std::iter::successors(Some(err), |&e| e.source())
        .map(ToString::to_string)
        .collect();

    let mut chain = err.to_string();
    for pair in messages.windows(2) {
        if !pair[0].ends_with(pair[1].as_str()) {
            chain.push_str("\ncaused by: ");
            chain.push_str(&pair[1]);
        }
    }
    chain
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status();
        if status.is_server_error() {
            error!(error = %error_chain(&self.error), "request failed");
        }

        let body = ErrorBody {
            success: false,
            message: self.error.to_string(),
            traceback: (self.expose_details && status.is_server_error())
                .then(|| error_chain(&self.error)),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.with_details(false).into_response()
    }
}
