// src/ocr.rs

use crate::config::OcrSection;
use crate::error::OcrError;
use std::path::{Path, PathBuf};
use tokio::{fs, process::Command};
use tracing::{debug, info};

/// Rasterise a PDF with `pdftoppm` and read each page with `tesseract`.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    tesseract_cmd: String,
    pdftoppm_cmd: String,
    dpi: u32,
    lang: String,
}

impl OcrEngine {
    pub fn new(cfg: &OcrSection) -> Self {
        Self {
            tesseract_cmd: cfg.tesseract_cmd.clone(),
            pdftoppm_cmd: cfg.pdftoppm_cmd.clone(),
            dpi: cfg.dpi,
            lang: cfg.lang.clone(),
        }
    }

    /// OCR every page of `pdf`, joining page texts with newlines.
    pub async fn ocr_pdf(&self, pdf: &Path) -> Result<String, OcrError> {
        let scratch = tempfile::tempdir()?;
        let pages = self.render_pages(pdf, scratch.path()).await?;
        info!(pages = pages.len(), dpi = self.dpi, lang = %self.lang, "Running OCR");

        let mut text = String::new();
        for page in &pages {
            let page_text = self.ocr_image(page).await?;
            debug!(page = %page.display(), chars = page_text.len(), "OCR page done");
            text.push_str(&page_text);
            text.push('\n');
        }
        Ok(text)
    }

    async fn render_pages(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let prefix = out_dir.join("page");
        let out = Command::new(&self.pdftoppm_cmd)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .await?;
        if !out.status.success() {
            return Err(tool_failure(&self.pdftoppm_cmd, &out));
        }

        let mut pages = Vec::new();
        let mut entries = fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                pages.push(path);
            }
        }
        if pages.is_empty() {
            return Err(OcrError::NoPages);
        }
        // pdftoppm zero-pads page numbers to a common width.
        pages.sort();
        Ok(pages)
    }

    async fn ocr_image(&self, image: &Path) -> Result<String, OcrError> {
        let out = Command::new(&self.tesseract_cmd)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .await?;
        if !out.status.success() {
            return Err(tool_failure(&self.tesseract_cmd, &out));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

fn tool_failure(tool: &str, out: &std::process::Output) -> OcrError {
    OcrError::Tool {
        tool: tool.to_string(),
        status: out.status,
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let engine = OcrEngine::new(&OcrSection {
            pdftoppm_cmd: "/nonexistent/pdftoppm".to_string(),
            ..OcrSection::default()
        });
        let err = engine.ocr_pdf(Path::new("whatever.pdf")).await.unwrap_err();
        assert!(matches!(err, OcrError::Io(_)), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_reports_status() {
        // `false` exits non-zero without output on any Unix.
        let engine = OcrEngine::new(&OcrSection {
            pdftoppm_cmd: "false".to_string(),
            ..OcrSection::default()
        });
        let err = engine.ocr_pdf(Path::new("whatever.pdf")).await.unwrap_err();
        assert!(matches!(err, OcrError::Tool { .. }), "{err}");
    }
}
