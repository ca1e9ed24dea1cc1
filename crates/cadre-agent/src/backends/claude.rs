use super::{http_client, CompletionBackend};
use crate::config::ModelConfig;
use cadre_core::{CadreError, CadreResult};
use async_trait::async_trait;

/// Claude (Anthropic Messages API) backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    api_key: String,
    http: reqwest::Client,
}

impl ClaudeBackend {
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
}

#[async_trait]
impl CompletionBackend for ClaudeBackend {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> CadreResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system_prompt,
            "messages": [{"role": "user", "content": prompt}],
        });

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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
                "Claude API error {status}: {resp_body}"
            )));
        }

        parse_claude_response(&resp_body)
    }
}

/// Concatenate every `text` block of a Messages API response.
fn parse_claude_response(body: &serde_json::Value) -> CadreResult<String> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| CadreError::Provider("Claude response has no content array".into()))?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();

    Ok(text.join("\n"))
}
