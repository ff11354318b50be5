// src/llm/structure.rs

use super::LlmClient;
use super::clean::{clean_response, extract_json_object, repair_json};
use crate::error::LlmError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, info, warn};

/// Turns raw invoice text into loosely-structured invoice JSON.
///
/// The result carries no schema guarantee; on failure it is an object with a
/// single `raw_response` key holding whatever the model said.
#[async_trait]
pub trait InvoiceStructurer: Send + Sync {
    async fn structure(&self, text: &str) -> Value;
}

/// Longest text we forward to the model, in characters.
const MAX_TEXT_CHARS: usize = 24_000;

const SCHEMA_PROMPT: &str = r#"You are a highly accurate invoice parser.

Extract the following invoice text into a fully structured and complete
JSON object with the following schema:

{
  "supplier_info": "...",
  "po_numbers": ["..."],
  "items": [
    {
      "product_code": "...",
      "description": "...",
      "quantity": ...,
      "unit_price": ...,
      "total_price": ...
    }
  ],
  "summary": {
    "subtotal": ...,
    "vat": ...,
    "total": ...
  }
}

VERY IMPORTANT:
- DO NOT skip, shorten, or summarize any line items.
- DO NOT use "...", "and more", or "truncated".
- INCLUDE EVERY product/item as seen in the invoice text.
- DO NOT include markdown formatting like ```json
- DO NOT write explanations, headers, or natural language

Return ONLY the final JSON, strictly valid and machine-readable."#;

pub struct LlmStructurer {
    client: Arc<LlmClient>,
}

impl LlmStructurer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InvoiceStructurer for LlmStructurer {
    async fn structure(&self, text: &str) -> Value {
        let span = tracing::info_span!("structure", model = %self.client.model());
        let prompt = build_prompt(text);

        async {
            match self.client.complete(&prompt).await {
                Ok(raw) => parse_invoice_json(&raw),
                Err(LlmError::EmptyReply) => {
                    warn!("LLM returned an empty reply");
                    raw_response("")
                }
                Err(e) => {
                    warn!(error = %e, "LLM structuring failed");
                    raw_response(&e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn build_prompt(text: &str) -> String {
    let text = match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((cut, _)) => {
            warn!(max_chars = MAX_TEXT_CHARS, "Invoice text truncated for the LLM");
            &text[..cut]
        }
        None => text,
    };
    format!("{SCHEMA_PROMPT}\n\nINVOICE TEXT:\n{text}\n\n### JSON:\n")
}

/// Parse a model reply into invoice JSON, or wrap it as `raw_response`.
pub fn parse_invoice_json(raw: &str) -> Value {
    let cleaned = clean_response(raw);
    let Some(object) = extract_json_object(&cleaned) else {
        warn!("No JSON object found in LLM reply");
        return raw_response(&cleaned);
    };

    match serde_json::from_str::<Value>(&repair_json(object)) {
        Ok(value) => {
            info!(
                keys = value.as_object().map_or(0, |m| m.len()),
                "Parsed structured invoice JSON"
            );
            value
        }
        Err(e) => {
            warn!(error = %e, "LLM reply is not valid JSON");
            raw_response(&cleaned)
        }
    }
}

fn raw_response(text: &str) -> Value {
    json!({ "raw_response": text })
}
