use crate::types::{StepStatus, WorkflowExecution};
use cadre_core::{CadreError, CadreResult};
use std::fmt::Write as _;
use std::str::FromStr;

/// Rendering of a finished (or in-flight) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Human-readable report.
    #[default]
    Markdown,
    /// Pretty-printed execution dump.
    Json,
}

impl FromStr for ExportFormat {
    type Err = CadreError;

    fn from_str(s: &str) -> CadreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            other => Err(CadreError::Config(format!(
                "unknown export format '{other}' (expected markdown or json)"
            ))),
        }
    }
}

impl ExportFormat {
    /// MIME type of the rendered output.
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    /// Render `execution` in this format.
    pub fn render(self, execution: &WorkflowExecution) -> CadreResult<String> {
        match self {
            ExportFormat::Markdown => Ok(to_markdown(execution)),
            ExportFormat::Json => to_json(execution),
        }
    }
}

/// Pretty-printed structural dump.
pub fn to_json(execution: &WorkflowExecution) -> CadreResult<String> {
    Ok(serde_json::to_string_pretty(execution)?)
}

/// Human-readable report: status, steps, then the deliverable if any.
pub fn to_markdown(execution: &WorkflowExecution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", execution.description.trim());
    let _ = writeln!(out, "- **Task**: {}", execution.task_id);
    let _ = writeln!(out, "- **Status**: {}", execution.status);
    let _ = writeln!(out, "- **Progress**: {}%", execution.progress);
    if let Some(cost) = execution.estimated_cost {
        let _ = writeln!(out, "- **Estimated cost**: {cost:.2}");
    }
    if let Some(error) = &execution.error {
        let _ = writeln!(out, "- **Error**: {error}");
    }

    if !execution.step_results.is_empty() {
        out.push_str("\n## Steps\n\n| Step | Agent | Action | Status |\n|---|---|---|---|\n");
        for step in execution.step_results.values() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                step.id, step.agent_id, step.action, step.status
            );
        }
        for step in execution.step_results.values() {
            if step.status != StepStatus::Completed {
                if let Some(reason) = &step.error {
                    let _ = writeln!(out, "\n> {} {}: {reason}", step.id, step.status);
                }
            }
        }
    }

    let Some(deliverable) = &execution.final_deliverable else {
        return out;
    };

    let _ = writeln!(out, "\n## Executive summary\n\n{}", deliverable.executive_summary);
    push_list(&mut out, "Key findings", &deliverable.key_findings);
    if !deliverable.agent_contributions.is_empty() {
        out.push_str("\n## Agent contributions\n");
        for c in &deliverable.agent_contributions {
            let _ = writeln!(out, "\n### {}\n\n{}", c.agent_name, c.contribution);
            for h in &c.highlights {
                let _ = writeln!(out, "- {h}");
            }
        }
    }
    push_list(&mut out, "Recommendations", &deliverable.recommendations);
    push_list(&mut out, "Next steps", &deliverable.next_steps);
    let _ = writeln!(out, "\n## Full report\n\n{}", deliverable.full_report);
    out
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## {title}\n");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}
