pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod ocr;
pub mod pdf_extract;
pub mod report;

pub use api::{AppState, build_router};
pub use config::Config;
pub use report::{ConsistencyReport, Summarizer, check_consistency, generate_report};
