/// Anthropic Messages API.
pub mod claude;
/// OpenAI-compatible chat completions.
pub mod openai;

use crate::config::{LlmProvider, ModelConfig};
use cadre_core::{CadreError, CadreResult};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for completion provider backends.
///
/// A backend performs exactly one request per call. It never retries; the
/// caller decides what a failure means.
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `CompletionBackend` for your struct
/// 3. Add the variant to `LlmProvider` in `config.rs`
/// 4. Wire it up in [`build_backend`]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Single-shot completion of `prompt` under `system_prompt`.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> CadreResult<String>;
}

/// Build the backend matching `config.provider`.
pub fn build_backend(config: ModelConfig) -> CadreResult<Box<dyn CompletionBackend>> {
    let backend: Box<dyn CompletionBackend> = match config.provider {
        LlmProvider::Claude => Box::new(claude::ClaudeBackend::new(config)?),
        LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
            Box::new(openai::OpenAiBackend::new(config)?)
        }
    };
    Ok(backend)
}

pub(crate) fn http_client(config: &ModelConfig) -> CadreResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CadreError::Http(format!("Failed to build HTTP client: {e}")))
}
