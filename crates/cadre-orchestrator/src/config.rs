use serde::{Deserialize, Serialize};

/// Tunables of the orchestration engine (`[orchestrator]` in `cadre.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Provider key used for request analysis.
    #[serde(default = "default_provider")]
    pub analyzer_provider: String,
    /// Provider key used to merge step outputs.
    #[serde(default = "default_provider")]
    pub collator_provider: String,
    /// Activities kept per agent.
    #[serde(default = "default_activity_history")]
    pub activity_history: usize,
    /// Seconds an agent counts as working after a non-terminal activity.
    #[serde(default = "default_working_window_secs")]
    pub working_window_secs: u64,
    /// Finished runs kept for status queries; the oldest go first.
    #[serde(default = "default_retained_executions")]
    pub retained_executions: usize,
}

fn default_provider() -> String {
    "claude".to_string()
}

fn default_activity_history() -> usize {
    100
}

fn default_working_window_secs() -> u64 {
    30
}

fn default_retained_executions() -> usize {
    500
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            analyzer_provider: default_provider(),
            collator_provider: default_provider(),
            activity_history: default_activity_history(),
            working_window_secs: default_working_window_secs(),
            retained_executions: default_retained_executions(),
        }
    }
}
