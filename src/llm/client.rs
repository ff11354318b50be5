// src/llm/client.rs

use crate::config::{LlmBackend, LlmSection, Secret};
use crate::error::LlmError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ollama native completion request.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Resolved endpoint configuration ready to make API calls.
#[derive(Debug, Clone)]
struct ResolvedEndpoint {
    backend: LlmBackend,
    base_url: String,
    model: String,
    api_key: Option<Secret>,
}

/// Resolve the LLM config section into a concrete endpoint.
fn resolve_endpoint(llm: &LlmSection) -> Result<ResolvedEndpoint, LlmError> {
    match llm.backend {
        LlmBackend::Ollama => Ok(ResolvedEndpoint {
            backend: LlmBackend::Ollama,
            base_url: llm.ollama.base_url.trim_end_matches('/').to_string(),
            model: llm.ollama.model.clone(),
            api_key: None,
        }),
        LlmBackend::Remote => {
            let api_key = llm.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;
            Ok(ResolvedEndpoint {
                backend: LlmBackend::Remote,
                base_url: llm.remote.base_url.trim_end_matches('/').to_string(),
                model: llm.remote.model.clone(),
                api_key: Some(api_key.clone()),
            })
        }
    }
}

/// Text completion against the configured backend.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    endpoint: ResolvedEndpoint,
}

impl LlmClient {
    pub fn from_config(llm: &LlmSection) -> Result<Self, LlmError> {
        let endpoint = resolve_endpoint(llm)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()?;
        info!(
            backend = ?endpoint.backend,
            url = %endpoint.base_url,
            model = %endpoint.model,
            timeout_secs = llm.timeout_secs,
            "LLM client ready"
        );
        Ok(Self { http, endpoint })
    }

    pub fn model(&self) -> &str {
        &self.endpoint.model
    }

    /// Send `prompt` and return the raw reply text.
    ///
    /// Non-success statuses and blank replies are errors.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let reply = match self.endpoint.backend {
            LlmBackend::Ollama => self.generate(prompt).await?,
            LlmBackend::Remote => self.chat(prompt).await?,
        };
        debug!(chars = reply.len(), "LLM reply received");
        if reply.trim().is_empty() {
            return Err(LlmError::EmptyReply);
        }
        Ok(reply)
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.endpoint.model,
            prompt,
            stream: false,
        };
        let url = format!("{}/api/generate", self.endpoint.base_url);
        let response = self.http.post(&url).json(&request).send().await?;
        let response = check_status(response).await?;
        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }

    async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };
        let url = format!("{}/chat/completions", self.endpoint.base_url);
        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.bearer_auth(key.expose());
        }
        let response = check_status(builder.send().await?).await?;
        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyReply)
    }

    /// Check if the Ollama server is reachable. Other backends always pass.
    pub async fn check_health(&self) -> bool {
        if self.endpoint.backend != LlmBackend::Ollama {
            return true;
        }

        match self
            .http
            .get(&self.endpoint.base_url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(resp) => {
                if resp.status().is_success() {
                    info!("Ollama server is reachable");
                    true
                } else {
                    warn!(status = %resp.status(), "Ollama server returned non-OK status");
                    false
                }
            }
            Err(e) => {
                warn!(error = %e, "Ollama server not reachable");
                false
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Status { status, body })
}
