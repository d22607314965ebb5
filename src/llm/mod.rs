pub mod models;
pub mod prompts;
pub mod providers;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::LlmConfig;
pub use models::{ChatPurpose, ChatRequest};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
    #[error("Prompt rendering error: {0}")]
    PromptError(String),
}

impl From<minijinja::Error> for LlmError {
    fn from(err: minijinja::Error) -> Self {
        LlmError::PromptError(err.to_string())
    }
}

/// A chat-completion backend: one system instruction, one user message, one answer.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Process-wide handle, built once at startup and shared read-only.
pub type SharedModel = Arc<dyn ChatModel>;

/// Builds the configured backend.
///
/// `Ok(None)` means no backend is usable (no API key, or `backend = "none"`);
/// callers degrade to their fallback paths.
pub fn backend_from_config(config: &LlmConfig) -> Result<Option<SharedModel>, LlmError> {
    let model: SharedModel = match config.backend.as_str() {
        "openai" | "remote" => {
            if config.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                warn!(
                    "No API key configured for the {} backend (set OPENAI_API_KEY); \
                     validation and summaries fall back to built-in rules, SQL generation is disabled",
                    config.backend
                );
                return Ok(None);
            }
            Arc::new(providers::remote::RemoteLlmProvider::new(config)?)
        }
        "ollama" => Arc::new(providers::ollama::OllamaProvider::new(config)?),
        "none" | "disabled" => {
            warn!("LLM backend disabled by configuration");
            return Ok(None);
        }
        _ => {
            return Err(LlmError::ConfigError(format!(
                "Unsupported LLM backend: {}",
                config.backend
            )));
        }
    };

    info!("LLM backend '{}' ready with model {}", config.backend, config.model);
    Ok(Some(model))
}
