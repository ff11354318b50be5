// src/llm/summary.rs

use super::LlmClient;
use crate::report::Summarizer;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, info, warn};

/// Narrative summaries from the configured LLM backend.
pub struct LlmSummarizer {
    client: Arc<LlmClient>,
}

impl LlmSummarizer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, invoice: &Value) -> String {
        let span = tracing::info_span!("narrative", model = %self.client.model());
        let prompt = build_prompt(invoice);

        async {
            match self.client.complete(&prompt).await {
                Ok(reply) => {
                    let summary = reply.trim().to_string();
                    info!(chars = summary.len(), "Narrative summary generated");
                    summary
                }
                Err(e) => {
                    warn!(error = %e, "Narrative summary failed");
                    failure_message(&e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn build_prompt(invoice: &Value) -> String {
    let data = serde_json::to_string_pretty(invoice).unwrap_or_else(|_| invoice.to_string());
    format!(
        "You are a smart invoice checker assistant.

Based on the following invoice JSON, generate a natural language report:
- Detect if there are incorrect totals, mismatched VAT, or subtotal issues
- Mention if any line item calculations are wrong
- Note if there are duplicate PO numbers
- Do not explain what the fields mean, just analyze

INVOICE DATA:
{data}

Reply in professional English in less than 120 words.
"
    )
}

fn failure_message(reason: &dyn std::fmt::Display) -> String {
    format!("LLM summary generation failed: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSection;
    use httpmock::prelude::*;
    use serde_json::json;

    async fn summarizer_replying(status: u16, body: Value) -> (MockServer, LlmSummarizer) {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(status)
                    .header("content-type", "application/json")
                    .json_body(body);
            })
            .await;

        let mut llm = LlmSection::default();
        llm.ollama.base_url = server.base_url();
        llm.timeout_secs = 5;
        let summarizer = LlmSummarizer::new(Arc::new(LlmClient::from_config(&llm).unwrap()));
        (server, summarizer)
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let (_server, summarizer) = summarizer_replying(200, json!({ "response": " ok " })).await;
        assert_eq!(summarizer.summarize(&json!({})).await, "ok");
    }

    #[tokio::test]
    async fn test_error_status_becomes_text() {
        let (_server, summarizer) =
            summarizer_replying(500, json!({ "error": "model not found" })).await;
        let text = summarizer.summarize(&json!({})).await;
        assert!(text.starts_with("LLM summary generation failed: LLM API error 500"), "{text}");
        assert!(text.contains("model not found"), "{text}");
    }

    #[tokio::test]
    async fn test_blank_reply_becomes_text() {
        let (_server, summarizer) = summarizer_replying(200, json!({ "response": "   " })).await;
        assert_eq!(
            summarizer.summarize(&json!({})).await,
            "LLM summary generation failed: empty response from LLM"
        );
    }

    #[test]
    fn test_prompt_carries_invoice_data() {
        let p = build_prompt(&json!({ "po_numbers": ["PO-1", "PO-1"] }));
        assert!(p.contains("INVOICE DATA:\n{\n  \"po_numbers\": ["));
        assert!(p.contains("less than 120 words"));
        assert!(p.contains("Do not explain what the fields mean"));
    }

    #[tokio::test]
    async fn test_failure_becomes_text() {
        let mut llm = LlmSection::default();
        llm.ollama.base_url = "http://127.0.0.1:9".to_string();
        llm.timeout_secs = 2;
        let summarizer = LlmSummarizer::new(Arc::new(LlmClient::from_config(&llm).unwrap()));

        let text = summarizer.summarize(&json!({})).await;
        assert!(text.starts_with("LLM summary generation failed: "), "{text}");
    }
}
