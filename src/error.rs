// src/error.rs

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// The only failures the report engine propagates. Everything below the
/// top level degrades into per-item errors or zero defaults instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("invoice data must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
    #[error("invoice items must be a list, got {found}")]
    ItemsNotIterable { found: &'static str },
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LLM API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("empty response from LLM")]
    EmptyReply,
    #[error("LLM_API_KEY env var required for remote backend")]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("no page images were rendered")]
    NoPages,
}

/// Errors surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized access")]
    Unauthorized,
    #[error("Missing or invalid PDF file")]
    InvalidUpload,
    #[error("Uploaded file is too large")]
    UploadTooLarge,
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidUpload => StatusCode::BAD_REQUEST,
            ApiError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Report(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
