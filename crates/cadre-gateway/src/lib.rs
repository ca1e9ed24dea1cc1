//! HTTP surface of the Cadre orchestration engine.
//!
//! Tasks are accepted with `202` and run in the background; clients poll
//! `GET /tasks/{id}` or fetch a rendered report from `/tasks/{id}/export`.

/// Mapping of engine errors to HTTP responses.
pub mod error;
/// Router, handlers and wire types.
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
