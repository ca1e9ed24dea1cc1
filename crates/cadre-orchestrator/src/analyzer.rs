use crate::parse::extract_json_object;
use crate::roster::Roster;
use crate::types::{Complexity, ExecutionStrategy, Phase, TaskAnalysis};
use cadre_agent::{CompletionGateway, CompletionRequest};
use cadre_core::{CadreError, CadreResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a free-text request into a validated [`TaskAnalysis`].
pub struct TaskAnalyzer {
    gateway: Arc<dyn CompletionGateway>,
    provider: String,
}

/// Shape the provider must answer with, before validation.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    complexity: String,
    required_agents: Vec<String>,
    execution_strategy: String,
    #[serde(default)]
    phases: Vec<RawPhase>,
    #[serde(default)]
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    name: String,
    #[serde(default)]
    agents: Vec<String>,
    #[serde(default)]
    depends_on: Vec<String>,
}

impl TaskAnalyzer {
    /// Analyzer calling through `gateway` on `provider`.
    pub fn new(gateway: Arc<dyn CompletionGateway>, provider: impl Into<String>) -> Self {
        Self {
            gateway,
            provider: provider.into(),
        }
    }

    /// One provider call; any failure or schema violation is an `Analysis` error.
    pub async fn analyze(&self, description: &str, roster: &Roster) -> CadreResult<TaskAnalysis> {
        let request = CompletionRequest::new(
            &self.provider,
            "task analyzer",
            ANALYZER_PROMPT,
            build_analysis_task(description, roster),
        );

        let content = self
            .gateway
            .complete(request)
            .await
            .into_content()
            .map_err(|e| CadreError::Analysis(format!("analyzer call failed: {e}")))?;

        let analysis = parse_analysis(&content, roster)?;
        info!(
            complexity = %analysis.complexity,
            strategy = %analysis.execution_strategy,
            agents = ?analysis.required_agent_ids,
            "Analysis complete"
        );
        Ok(analysis)
    }
}

fn build_analysis_task(description: &str, roster: &Roster) -> String {
    format!(
        "## Available agents (id | role | capabilities)\n{}\n\n## Request\n{}\n\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"complexity\": \"simple|moderate|complex|enterprise\", \
         \"required_agents\": [\"<agent id>\", ...], \
         \"execution_strategy\": \"sequential|parallel|hybrid\", \
         \"phases\": [{{\"name\": \"...\", \"agents\": [\"<agent id>\"], \"depends_on\": [\"<phase name>\"]}}], \
         \"rationale\": \"...\"}}",
        roster.summary(),
        description.trim()
    )
}

/// Parse and validate the analyzer response against the roster.
pub fn parse_analysis(content: &str, roster: &Roster) -> CadreResult<TaskAnalysis> {
    let object = extract_json_object(content).ok_or_else(|| {
        warn!("Analyzer response contained no JSON object");
        CadreError::Analysis("response contained no JSON object".into())
    })?;

    let raw: RawAnalysis = serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| CadreError::Analysis(format!("response does not match schema: {e}")))?;

    let complexity: Complexity = raw.complexity.trim().to_ascii_lowercase().parse()?;
    let execution_strategy: ExecutionStrategy =
        raw.execution_strategy.trim().to_ascii_lowercase().parse()?;

    let mut required_agent_ids: Vec<String> = Vec::with_capacity(raw.required_agents.len());
    for id in raw.required_agents {
        let id = id.trim().to_string();
        if !roster.contains(&id) {
            return Err(CadreError::Analysis(format!("unknown agent '{id}'")));
        }
        if !required_agent_ids.contains(&id) {
            required_agent_ids.push(id);
        }
    }

    let mut phases = Vec::with_capacity(raw.phases.len());
    for phase in raw.phases {
        if let Some(unknown) = phase.agents.iter().find(|id| !roster.contains(id.trim())) {
            return Err(CadreError::Analysis(format!(
                "phase '{}' references unknown agent '{unknown}'",
                phase.name
            )));
        }
        phases.push(Phase {
            name: phase.name,
            agent_ids: phase.agents.iter().map(|id| id.trim().to_string()).collect(),
            depends_on_phases: phase.depends_on,
        });
    }

    Ok(TaskAnalysis {
        complexity,
        required_agent_ids,
        execution_strategy,
        phases,
        rationale: raw.rationale,
    })
}

const ANALYZER_PROMPT: &str = "\
You are the dispatcher of a team of specialist agents. Read a work request \
and decide which agents must take part.

Rules:
1. Only use agent ids from the list you are given.
2. Pick the fewest agents that can deliver the request well.
3. Rate complexity as simple, moderate, complex or enterprise.
4. Choose sequential when agents build on each other's output, parallel when \
   they work independently, hybrid otherwise.
5. Answer with the JSON object only.
";
