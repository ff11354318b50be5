use invoice_check::api::{self, AppState};
use invoice_check::llm::{LlmClient, LlmStructurer, LlmSummarizer};
use invoice_check::ocr::OcrEngine;
use invoice_check::pdf_extract::PdfTextExtractor;
use invoice_check::report::Summarizer;
use invoice_check::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Arc::new(Config::from_env()?);
    info!(
        addr = %cfg.bind_addr(),
        backend = ?cfg.llm.backend,
        narrative = cfg.report.narrative,
        ocr_lang = %cfg.ocr.lang,
        "Configuration loaded"
    );

    let llm = Arc::new(LlmClient::from_config(&cfg.llm)?);
    if !llm.check_health().await {
        tracing::warn!("LLM backend unreachable at startup; requests will degrade until it is up");
    }

    let summarizer: Option<Arc<dyn Summarizer>> = if cfg.report.narrative {
        Some(Arc::new(LlmSummarizer::new(llm.clone())))
    } else {
        info!("Narrative summaries disabled");
        None
    };

    let state = AppState {
        extractor: Arc::new(PdfTextExtractor::new(OcrEngine::new(&cfg.ocr))),
        structurer: Arc::new(LlmStructurer::new(llm)),
        summarizer,
        config: cfg,
    };

    api::serve(state).await?;

    Ok(())
}
