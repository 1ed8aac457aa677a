use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{ExecutionError, ScenarioError};

/// Everything a route can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] JsonRejection),
    #[error(transparent)]
    InvalidScenario(#[from] ScenarioError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("invalid multipart form: {0}")]
    Multipart(#[from] MultipartError),
    #[error("form has no `file` field with a usable file name")]
    MissingFile,
    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
            ApiError::InvalidScenario(_) => (StatusCode::BAD_REQUEST, "INVALID_SCENARIO"),
            ApiError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "UPLOAD_TOO_LARGE")
            }
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "INVALID_FORM"),
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ApiError::Execution(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXECUTION_FAILED"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{code}: {self}");
        } else {
            tracing::debug!("{code}: {self}");
        }

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
