use cadre_core::{CadreError, CadreResult};
use serde::{Deserialize, Serialize};

/// Supported completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Claude,
    /// OpenAI chat completions.
    OpenAi,
    /// OpenRouter, OpenAI-compatible API.
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
}

/// Connection settings for one completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which API to speak.
    pub provider: LlmProvider,
    /// Model name sent with each request.
    pub model_id: String,
    /// Inline key. Takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Override for the provider base URL.
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout. The orchestration core has none of its own.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

impl ModelConfig {
    /// Configured base URL, or the provider default.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                LlmProvider::Claude => "https://api.anthropic.com",
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
            }
        }
    }

    /// Resolve the API key from the inline value or the configured env var.
    pub fn resolve_api_key(&self) -> CadreResult<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        match &self.api_key_env {
            Some(var) => std::env::var(var).map_err(|_| {
                CadreError::Config(format!(
                    "API key variable '{var}' is not set for model '{}'",
                    self.model_id
                ))
            }),
            None => Err(CadreError::Config(format!(
                "No api_key or api_key_env configured for model '{}'",
                self.model_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> ModelConfig {
        ModelConfig {
            provider,
            model_id: "test-model".to_string(),
            api_key: None,
            api_key_env: None,
            api_base_url: None,
            temperature: 0.2,
            max_tokens: 512,
            timeout_secs: 10,
        }
    }

    #[test]
    fn test_default_base_urls() {
        assert_eq!(config(LlmProvider::Claude).base_url(), "https://api.anthropic.com");
        assert_eq!(config(LlmProvider::Groq).base_url(), "https://api.groq.com/openai");
    }

    #[test]
    fn test_base_url_override() {
        let mut cfg = config(LlmProvider::OpenAi);
        cfg.api_base_url = Some("http://localhost:9999".into());
        assert_eq!(cfg.base_url(), "http://localhost:9999");
    }

    #[test]
    fn test_inline_key_wins() {
        let mut cfg = config(LlmProvider::Claude);
        cfg.api_key = Some("sk-inline".into());
        cfg.api_key_env = Some("CADRE_TEST_UNSET_KEY_VAR".into());
        assert_eq!(cfg.resolve_api_key().unwrap(), "sk-inline");
    }

    #[test]
    fn test_missing_env_key_is_config_error() {
        let mut cfg = config(LlmProvider::Claude);
        cfg.api_key_env = Some("CADRE_TEST_DEFINITELY_UNSET".into());
        let err = cfg.resolve_api_key().unwrap_err();
        assert!(matches!(err, CadreError::Config(_)));
    }

    #[test]
    fn test_serde_defaults_applied() {
        let cfg: ModelConfig = serde_json::from_str(
            r#"{"provider":"openrouter","model_id":"m","api_base_url":null}"#,
        )
        .unwrap();
        assert_eq!(cfg.provider, LlmProvider::OpenRouter);
        assert_eq!(cfg.max_tokens, 4096);
        assert_eq!(cfg.timeout_secs, 120);
        assert!(cfg.api_key.is_none());
    }
}
