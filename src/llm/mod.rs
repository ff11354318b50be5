// src/llm/mod.rs

mod clean;
mod client;
mod structure;
mod summary;

pub use client::LlmClient;
pub use structure::{InvoiceStructurer, LlmStructurer, parse_invoice_json};
pub use summary::LlmSummarizer;
