// src/api/handlers.rs

use super::AppState;
use crate::error::ApiError;
use crate::report::{self, ConsistencyReport};
use axum::extract::multipart::MultipartError;
use axum::extract::{Json, Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{Instrument, info, warn};

/// Multipart field carrying the PDF.
pub const UPLOAD_FIELD: &str = "invoice";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub extracted_data: Value,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub consistency_report: ConsistencyReport,
}

/// An uploaded PDF on disk. The file goes away with the value.
struct UploadedPdf {
    _dir: TempDir,
    path: PathBuf,
    filename: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { healthy: "Ok" })
}

/// PDF -> text -> structured invoice JSON.
pub async fn extract_invoice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let upload = receive_pdf(multipart).await?;
    let span = tracing::info_span!("extract", filename = %upload.filename);

    async {
        let text = state.extractor.extract_text(&upload.path).await;
        info!(chars = text.len(), "Text extracted");
        let extracted_data = state.structurer.structure(&text).await;
        Ok::<_, ApiError>(Json(ExtractResponse {
            extracted_data,
            text,
        }))
    }
    .instrument(span)
    .await
}

/// PDF -> text -> structured invoice JSON -> consistency report.
pub async fn report_invoice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let upload = receive_pdf(multipart).await?;
    let span = tracing::info_span!("report", filename = %upload.filename);

    async {
        let text = state.extractor.extract_text(&upload.path).await;
        info!(chars = text.len(), "Text extracted");
        let extracted = state.structurer.structure(&text).await;
        let consistency_report =
            report::generate_report(&extracted, state.summarizer.as_deref()).await?;
        Ok::<_, ApiError>(Json(ReportResponse { consistency_report }))
    }
    .instrument(span)
    .await
}

/// Pull the `invoice` field out of the form and write it to a scratch dir.
async fn receive_pdf(mut multipart: Multipart) -> Result<UploadedPdf, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| is_pdf_filename(name))
            .map(str::to_owned)
            .ok_or(ApiError::InvalidUpload)?;
        let data = field.bytes().await.map_err(upload_error)?;
        if data.is_empty() {
            return Err(ApiError::InvalidUpload);
        }

        let dir = tempfile::tempdir()?;
        // Never trust the client's filename as a path.
        let path = dir.path().join("upload.pdf");
        tokio::fs::write(&path, &data).await?;
        info!(filename = %filename, bytes = data.len(), "PDF received");

        return Ok(UploadedPdf {
            _dir: dir,
            path,
            filename,
        });
    }

    Err(ApiError::InvalidUpload)
}

fn upload_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %e, "Upload exceeds body limit");
        ApiError::UploadTooLarge
    } else {
        warn!(error = %e, "Malformed multipart upload");
        ApiError::InvalidUpload
    }
}

pub fn is_pdf_filename(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}
