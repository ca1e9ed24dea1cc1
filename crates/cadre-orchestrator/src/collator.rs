use crate::parse::extract_json_object;
use crate::types::{AgentContribution, Complexity, Deliverable, DeliverableMetadata};
use cadre_agent::{CompletionGateway, CompletionRequest};
use cadre_core::{CadreError, CadreResult};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Merges step outputs into one [`Deliverable`].
pub struct Collator {
    gateway: Arc<dyn CompletionGateway>,
    provider: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDeliverable {
    executive_summary: String,
    key_findings: Vec<String>,
    agent_contributions: Vec<AgentContribution>,
    recommendations: Vec<String>,
    next_steps: Vec<String>,
    full_report: String,
}

impl Collator {
    /// Collator calling through `gateway` on `provider`.
    pub fn new(gateway: Arc<dyn CompletionGateway>, provider: impl Into<String>) -> Self {
        Self {
            gateway,
            provider: provider.into(),
        }
    }

    /// Synthesize `outputs` (agent name, output) with one provider call.
    pub async fn collate(
        &self,
        description: &str,
        outputs: &[(String, String)],
        complexity: Complexity,
    ) -> CadreResult<Deliverable> {
        if outputs.is_empty() {
            return Err(CadreError::Collation(
                "no step succeeded, nothing to collate".into(),
            ));
        }

        let mut task = format!("## Original request\n{}\n\n## Agent outputs\n", description.trim());
        for (name, output) in outputs {
            task.push_str(&format!("\n### {name}\n{output}\n"));
        }
        task.push_str(COLLATION_SCHEMA);

        let request = CompletionRequest::new(&self.provider, "collator", COLLATOR_PROMPT, task);
        let content = self
            .gateway
            .complete(request)
            .await
            .into_content()
            .map_err(|e| CadreError::Collation(format!("collator call failed: {e}")))?;

        let deliverable = parse_deliverable(&content, description, outputs, complexity)?;
        info!(
            agents = deliverable.metadata.total_agents,
            findings = deliverable.key_findings.len(),
            "Collation complete"
        );
        Ok(deliverable)
    }
}

/// Deliverable for a single-step run, built without a provider call.
pub fn wrap_single(
    description: &str,
    agent_name: &str,
    output: &str,
    complexity: Complexity,
) -> Deliverable {
    Deliverable {
        executive_summary: summary_line(output),
        key_findings: Vec::new(),
        agent_contributions: vec![AgentContribution {
            agent_name: agent_name.to_string(),
            contribution: output.to_string(),
            highlights: Vec::new(),
        }],
        recommendations: Vec::new(),
        next_steps: Vec::new(),
        full_report: output.to_string(),
        metadata: DeliverableMetadata {
            task_description: description.to_string(),
            completed_at: Utc::now(),
            total_agents: 1,
            complexity,
        },
    }
}

fn parse_deliverable(
    content: &str,
    description: &str,
    outputs: &[(String, String)],
    complexity: Complexity,
) -> CadreResult<Deliverable> {
    let object = extract_json_object(content).ok_or_else(|| {
        warn!("Collator response contained no JSON object");
        CadreError::Collation("response contained no JSON object".into())
    })?;
    let raw: RawDeliverable = serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| CadreError::Collation(format!("response does not match schema: {e}")))?;

    let full_report = if raw.full_report.trim().is_empty() {
        outputs
            .iter()
            .map(|(name, output)| format!("## {name}\n\n{output}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        raw.full_report
    };

    let mut agents: Vec<&str> = Vec::new();
    for (name, _) in outputs {
        if !agents.contains(&name.as_str()) {
            agents.push(name);
        }
    }

    Ok(Deliverable {
        executive_summary: raw.executive_summary,
        key_findings: raw.key_findings,
        agent_contributions: raw.agent_contributions,
        recommendations: raw.recommendations,
        next_steps: raw.next_steps,
        full_report,
        metadata: DeliverableMetadata {
            task_description: description.to_string(),
            completed_at: Utc::now(),
            total_agents: agents.len(),
            complexity,
        },
    })
}

fn summary_line(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .trim_start_matches('#')
        .trim()
        .to_string()
}

const COLLATOR_PROMPT: &str = "\
You are the editor who turns the work of several specialist agents into one \
deliverable for the requester.

Rules:
1. Keep every concrete fact the agents produced; never invent new ones.
2. Attribute each contribution to the agent that made it.
3. Resolve contradictions explicitly instead of hiding them.
4. Answer with the JSON object only.
";

const COLLATION_SCHEMA: &str = "
Respond with a single JSON object:
{\"executive_summary\": \"...\", \"key_findings\": [\"...\"], \
\"agent_contributions\": [{\"agent_name\": \"...\", \"contribution\": \"...\", \"highlights\": [\"...\"]}], \
\"recommendations\": [\"...\"], \"next_steps\": [\"...\"], \"full_report\": \"markdown\"}";
