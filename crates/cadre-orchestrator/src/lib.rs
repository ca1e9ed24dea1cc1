//! Multi-agent orchestration engine: request analysis, plan building, wave
//! scheduling and collation.
//!
//! A request flows through the [`TaskAnalyzer`] (which agents are needed),
//! the planner (which steps they run and in what order), the [`Executor`]
//! (every ready step of a wave runs concurrently) and the [`Collator`]
//! (one deliverable out of many outputs). The [`Orchestrator`] threads a
//! single [`WorkflowExecution`] record through all of them.
//!
//! # Main types
//!
//! - [`Orchestrator`] — Top-level engine that runs the full pipeline.
//! - [`Roster`] — Read-only directory of agents.
//! - [`ActivityTracker`] — Per-agent activity history with a live feed.
//! - [`OrchestrationPlan`] — The step graph built for one request.

/// Per-agent activity log and broadcast feed.
pub mod activity;
/// Request analysis through a completion provider.
pub mod analyzer;
/// Merging of step outputs into a deliverable.
pub mod collator;
/// Engine configuration.
pub mod config;
/// Orchestration engine and pipeline execution.
pub mod engine;
/// Wave scheduler over a plan's dependency graph.
pub mod executor;
/// Markdown and JSON rendering of executions.
pub mod export;
/// JSON extraction from model output.
pub mod parse;
/// Pattern-rule plan builder.
pub mod planner;
/// Agent directory and the built-in roster.
pub mod roster;
/// Single-step execution through the gateway.
pub mod runner;
/// Shared orchestration types (Task, WorkflowStep, Deliverable, etc.).
pub mod types;

pub use activity::{ActivityTracker, AgentStats};
pub use analyzer::TaskAnalyzer;
pub use collator::{wrap_single, Collator};
pub use config::OrchestratorConfig;
pub use engine::Orchestrator;
pub use executor::{Executor, ProgressFn};
pub use export::{to_json, to_markdown, ExportFormat};
pub use planner::build_plan;
pub use roster::{default_roster, Roster};
pub use runner::StepRunner;
pub use types::{
    ActivityKind, Agent, AgentActivity, AgentContribution, AgentId, Complexity, Deliverable,
    DeliverableMetadata, ExecutionStatus, ExecutionStrategy, OrchestrationPlan, Phase, Priority,
    StepId, StepStatus, Task, TaskAnalysis, WorkflowExecution, WorkflowStep,
};
