// src/config.rs

use crate::error::ConfigError;
use serde::Deserialize;
use std::{fmt, fs, io, path::Path};

/// Default location of the TOML config, overridable via `INVOICE_CHECK_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "config/invoice_check.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    /// Shared secret expected in the `x-api-key` header.
    pub api_key: Option<Secret>,
    pub llm: LlmSection,
    pub ocr: OcrSection,
    pub report: ReportSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Upper bound for multipart uploads, in megabytes.
    pub max_upload_mb: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_mb: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server, native `/api/generate` endpoint.
    #[default]
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub backend: LlmBackend,
    pub timeout_secs: u64,
    pub ollama: EndpointSection,
    pub remote: EndpointSection,
    /// Bearer token for the remote backend. Only ever read from `LLM_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<Secret>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            timeout_secs: 120,
            ollama: EndpointSection {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
            },
            remote: EndpointSection {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointSection {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrSection {
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    pub dpi: u32,
    pub lang: String,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            pdftoppm_cmd: "pdftoppm".to_string(),
            dpi: 300,
            lang: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// Ask the LLM for a narrative summary alongside the rule-based checks.
    pub narrative: bool,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self { narrative: true }
    }
}

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Config {
    /// Parse a config file. The file must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Like [`Config::load`], but a missing file yields the built-in defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Load from `INVOICE_CHECK_CONFIG` (or the default path) and apply
    /// process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("INVOICE_CHECK_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let cfg = Self::load_or_default(&path)?;
        Ok(cfg.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply environment-style overrides from `lookup`. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("COMMON_API_KEY") {
            self.api_key = Some(Secret::new(key));
        }
        if let Some(host) = get("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("SERVER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = get("OLLAMA_HOST") {
            self.llm.ollama.base_url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.llm.ollama.model = model;
        }
        if let Some(key) = get("LLM_API_KEY") {
            self.llm.api_key = Some(Secret::new(key));
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
