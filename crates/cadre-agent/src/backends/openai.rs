use super::{http_client, CompletionBackend};
use crate::config::{LlmProvider, ModelConfig};
use cadre_core::{CadreError, CadreResult};
use async_trait::async_trait;

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, OpenRouter, Groq and any other provider that implements
/// the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiBackend {
    /// Create the backend, resolving the API key up front.
    pub fn new(config: ModelConfig) -> CadreResult<Self> {
        let api_key = config.resolve_api_key()?;
        let http = http_client(&config)?;
        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter wants attribution headers
        if self.config.provider == LlmProvider::OpenRouter {
            request.header("X-Title", "Cadre")
        } else {
            request
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> CadreResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": prompt},
            ],
        });

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| CadreError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CadreError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(CadreError::Provider(format!(
                "OpenAI-compatible API error {status}: {resp_body}"
            )));
        }

        resp_body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CadreError::Provider("Response has no message content".into()))
    }
}
