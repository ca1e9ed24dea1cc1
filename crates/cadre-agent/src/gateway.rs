use crate::backends::{build_backend, CompletionBackend};
use crate::config::ModelConfig;
use async_trait::async_trait;
use cadre_core::{CadreError, CadreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// One completion call made on behalf of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Provider key the request is routed to (e.g. `"claude"`).
    pub provider: String,
    /// Human-readable role of the caller, used for logging and prompt framing.
    pub role: String,
    /// Role instruction sent as the system prompt.
    pub system_instruction: String,
    /// The task prompt.
    pub task: String,
    /// Named context blocks appended after the task, in key order.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl CompletionRequest {
    /// Create a request with no context blocks.
    pub fn new(
        provider: impl Into<String>,
        role: impl Into<String>,
        system_instruction: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            role: role.into(),
            system_instruction: system_instruction.into(),
            task: task.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach named context blocks.
    pub fn with_context(mut self, context: BTreeMap<String, String>) -> Self {
        self.context = context;
        self
    }

    /// The user prompt sent to the provider: task followed by context blocks.
    pub fn render_prompt(&self) -> String {
        let mut prompt = self.task.clone();
        for (name, text) in &self.context {
            prompt.push_str(&format!("\n\n## Context from {name}\n{text}"));
        }
        prompt
    }
}

/// Outcome of a completion call as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Whether the provider call succeeded.
    pub success: bool,
    /// Generated text on success.
    pub content: Option<String>,
    /// Failure message.
    pub error: Option<String>,
}

impl CompletionResponse {
    /// Successful response carrying `content`.
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    /// Failed response carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }

    /// Convert into the generated text.
    ///
    /// `success = false`, a missing body and a blank body are all failures.
    pub fn into_content(self) -> CadreResult<String> {
        if !self.success {
            return Err(CadreError::Provider(
                self.error
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            ));
        }
        match self.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(CadreError::Provider("provider returned empty content".into())),
        }
    }
}

/// The boundary every agent call goes through.
///
/// Implementations must not retry; a failure is reported once and the
/// orchestrator decides what it means.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Answer one request. Failures are reported in the response.
    async fn complete(&self, request: CompletionRequest) -> CompletionResponse;
}

/// Gateway that routes requests to HTTP backends by provider key.
pub struct LlmGateway {
    backends: HashMap<String, Box<dyn CompletionBackend>>,
}

impl LlmGateway {
    /// Create a gateway with no backends.
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Build one backend per named model config.
    pub fn from_configs(configs: &BTreeMap<String, ModelConfig>) -> CadreResult<Self> {
        let mut gateway = Self::new();
        for (name, config) in configs {
            gateway.register(name.clone(), build_backend(config.clone())?);
        }
        Ok(gateway)
    }

    /// Register a pre-built backend (for custom/external providers).
    pub fn register(&mut self, name: impl Into<String>, backend: Box<dyn CompletionBackend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Registered provider keys, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for LlmGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionGateway for LlmGateway {
    async fn complete(&self, request: CompletionRequest) -> CompletionResponse {
        let Some(backend) = self.backends.get(&request.provider) else {
            warn!(provider = %request.provider, role = %request.role, "Unknown completion provider");
            return CompletionResponse::failure(format!(
                "unknown provider '{}'",
                request.provider
            ));
        };

        debug!(provider = %request.provider, role = %request.role, "Completion request");
        match backend
            .complete(&request.system_instruction, &request.render_prompt())
            .await
        {
            Ok(text) => CompletionResponse::ok(text),
            Err(e) => {
                warn!(provider = %request.provider, role = %request.role, error = %e, "Completion failed");
                CompletionResponse::failure(e.to_string())
            }
        }
    }
}
