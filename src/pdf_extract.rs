// src/pdf_extract.rs

use crate::ocr::OcrEngine;
use async_trait::async_trait;
use lopdf::Document;
use std::path::Path;
use tracing::{info, warn};

/// Result of attempting to extract text from a PDF.
#[derive(Debug)]
pub enum PdfContent {
    /// The PDF contains extractable text.
    Text(String),
    /// The PDF appears to be scanned / image-only and needs OCR.
    ScannedImage,
    /// Something went wrong during extraction.
    Error(String),
}

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold we treat it as scanned.
const MIN_TEXT_CHARS: usize = 20;

/// Produces raw text for an uploaded invoice.
///
/// Never fails: problems come back as a descriptive string, which the
/// structuring step then sees like any other text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, pdf_path: &Path) -> String;
}

/// Native text layer first, OCR when the PDF looks scanned.
pub struct PdfTextExtractor {
    ocr: OcrEngine,
}

impl PdfTextExtractor {
    pub fn new(ocr: OcrEngine) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, pdf_path: &Path) -> String {
        let native = match tokio::fs::read(pdf_path).await {
            Ok(bytes) => tokio::task::spawn_blocking(move || extract_text_from_pdf(&bytes))
                .await
                .unwrap_or_else(|e| PdfContent::Error(format!("PDF extraction panicked: {e}"))),
            Err(e) => PdfContent::Error(format!("Failed to read PDF: {e}")),
        };

        match native {
            PdfContent::Text(text) => return text,
            PdfContent::ScannedImage => info!("Falling back to OCR for scanned PDF"),
            PdfContent::Error(e) => warn!(error = %e, "Native extraction failed, trying OCR"),
        }

        match self.ocr.ocr_pdf(pdf_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "OCR failed");
                format!("OCR failed: {e}")
            }
        }
    }
}

/// Main entry point: takes raw PDF bytes and returns `PdfContent`.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> PdfContent {
    // --- Phase 1: structural check with lopdf ---
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return PdfContent::Error(format!("Failed to parse PDF: {e}")),
    };

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return PdfContent::ScannedImage;
    }

    // --- Phase 2: attempt full text extraction ---
    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) => classify_text(text),
        Err(e) => {
            warn!(error = %e, "pdf-extract failed, may be scanned or corrupted");
            PdfContent::ScannedImage
        }
    }
}

/// Too little text after stripping whitespace means there is no usable text layer.
fn classify_text(text: String) -> PdfContent {
    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(
            chars = meaningful,
            "Extracted text too short, treating as scanned"
        );
        PdfContent::ScannedImage
    } else {
        info!(chars = meaningful, "Text extracted successfully");
        PdfContent::Text(text)
    }
}

/// Heuristic: inspect the PDF object tree for signs that every page
/// is just a single image with no text operators.
///
/// We look at each page's `Resources` dictionary. If a page has
/// XObject images but **no** Font resources, it's almost certainly
/// a scanned page.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // can't tell, let text extraction try
    }

    let image_only_pages = pages
        .values()
        .filter(|&&object_id| {
            let Some(resources) = doc
                .get_object(object_id)
                .and_then(|o| o.as_dict())
                .ok()
                .and_then(|page| page.get(b"Resources").ok())
                .and_then(|r| doc.dereference(r).ok())
                .and_then(|(_, resolved)| resolved.as_dict().ok())
            else {
                return false;
            };

            has_entries(doc, resources, b"XObject") && !has_entries(doc, resources, b"Font")
        })
        .count();

    let total = pages.len();
    let ratio = image_only_pages as f64 / total as f64;
    info!(
        total_pages = total,
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    // If ≥80% of pages are image-only, treat the whole PDF as scanned
    ratio >= 0.8
}

/// Whether `resources[key]` resolves to a non-empty dictionary.
fn has_entries(doc: &Document, resources: &lopdf::Dictionary, key: &[u8]) -> bool {
    resources
        .get(key)
        .ok()
        .and_then(|v| doc.dereference(v).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|d| !d.is_empty())
}
