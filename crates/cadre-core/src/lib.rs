//! Core error definitions for the Cadre framework.
//!
//! Every Cadre crate reports failures through [`CadreError`]. The variants
//! follow the phases of an orchestration run, so a caller can tell an
//! analysis failure from a planning, scheduling or collation failure without
//! parsing messages.
//!
//! # Main types
//!
//! - [`CadreError`] — Unified error enum for all Cadre subsystems.
//! - [`CadreResult`] — Convenience alias for `Result<T, CadreError>`.

/// Top-level error type for the Cadre framework.
///
/// `Analysis`, `Planning`, `SchedulingDeadlock` and `Collation` abort a run.
/// `Step` is recorded on a single workflow step and never aborts siblings.
#[derive(Debug, thiserror::Error)]
pub enum CadreError {
    /// The analyzer response was missing, malformed or referenced unknown agents.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// No executable plan could be built from the analysis.
    #[error("Planning error: {0}")]
    Planning(String),

    /// The scheduler found unresolved steps that can never become ready.
    #[error("Scheduling deadlock: steps [{}] can never become ready", .stuck.join(", "))]
    SchedulingDeadlock {
        /// Ids of the steps left unresolved.
        stuck: Vec<String>,
    },

    /// A single step's provider call failed or returned blank content.
    #[error("Step failed: {0}")]
    Step(String),

    /// The deliverable could not be synthesized.
    #[error("Collation error: {0}")]
    Collation(String),

    /// A completion provider reported a failure.
    #[error("Provider error: {0}")]
    Provider(String),

    /// An outbound HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration parsing or validation failed.
    #[error("Config error: {0}")]
    Config(String),

    /// A task, agent or execution lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CadreError {
    /// Whether this error aborts a whole run rather than a single step.
    pub fn is_phase_failure(&self) -> bool {
        matches!(
            self,
            CadreError::Analysis(_)
                | CadreError::Planning(_)
                | CadreError::SchedulingDeadlock { .. }
                | CadreError::Collation(_)
        )
    }
}

/// A convenience `Result` alias using [`CadreError`].
pub type CadreResult<T> = Result<T, CadreError>;
