//! Completion provider gateway for Cadre agents.
//!
//! Agents never talk to an LLM API directly. They hand a
//! [`CompletionRequest`] to a [`CompletionGateway`], which answers with a
//! [`CompletionResponse`]. [`LlmGateway`] is the HTTP-backed implementation
//! that routes each request to a named provider backend.

/// HTTP backends for Claude and OpenAI-compatible APIs.
pub mod backends;
/// Provider and model configuration.
pub mod config;
/// The gateway trait, request/response types and the routing gateway.
pub mod gateway;

pub use backends::CompletionBackend;
pub use config::{LlmProvider, ModelConfig};
pub use gateway::{CompletionGateway, CompletionRequest, CompletionResponse, LlmGateway};
