use crate::roster::Roster;
use crate::types::{Agent, OrchestrationPlan, StepId, TaskAnalysis, WorkflowStep};
use cadre_core::{CadreError, CadreResult};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

const COLLATION_COST: f64 = 0.5;
const STEP_BASE_COST: f64 = 1.0;

/// One stage of a pattern rule.
struct Stage {
    action: &'static str,
    description: &'static str,
    /// Any of these capabilities can serve the stage.
    capabilities: &'static [&'static str],
    /// Indices of earlier stages in the same rule.
    depends_on: &'static [usize],
}

/// Keyword co-occurrence rule: every group must contribute at least one token.
struct PatternRule {
    name: &'static str,
    groups: &'static [&'static [&'static str]],
    stages: &'static [Stage],
}

/// Evaluated in order; the first rule that matches and can be staffed wins.
const RULES: &[PatternRule] = &[
    PatternRule {
        name: "lead_outreach",
        groups: &[
            &["lead", "leads", "prospect", "prospects"],
            &["email", "emails", "outreach", "cold"],
        ],
        stages: &[
            Stage {
                action: "discover_leads",
                description: "Identify qualified leads and their contact channels",
                capabilities: &["lead_generation", "prospecting"],
                depends_on: &[],
            },
            Stage {
                action: "write_outreach",
                description: "Write personalized outreach emails for the discovered leads",
                capabilities: &["outreach", "copywriting", "email"],
                depends_on: &[0],
            },
        ],
    },
    PatternRule {
        name: "seo_content",
        groups: &[&["blog", "article", "post"], &["seo", "keyword", "keywords"]],
        stages: &[
            Stage {
                action: "research_keywords",
                description: "Research target keywords and search intent",
                capabilities: &["keyword_research", "seo"],
                depends_on: &[],
            },
            Stage {
                action: "write_content",
                description: "Write the search-optimized piece from the keyword brief",
                capabilities: &["content_writing", "blog"],
                depends_on: &[0],
            },
        ],
    },
    PatternRule {
        name: "ad_campaign",
        groups: &[&["campaign", "campaigns"], &["ad", "ads", "advertising"]],
        stages: &[
            Stage {
                action: "write_ad_copy",
                description: "Write ad copy variants for each channel",
                capabilities: &["ad_copy"],
                depends_on: &[],
            },
            Stage {
                action: "launch_campaign",
                description: "Build the launch plan around the ad copy",
                capabilities: &["campaign_launch", "advertising"],
                depends_on: &[0],
            },
            Stage {
                action: "measure_results",
                description: "Define metrics, targets and reporting for the campaign",
                capabilities: &["analytics", "measurement"],
                depends_on: &[1],
            },
        ],
    },
    PatternRule {
        name: "product_launch",
        groups: &[&["launch"], &["announce", "announcement"]],
        stages: &[
            Stage {
                action: "write_announcement",
                description: "Write the launch announcement post",
                capabilities: &["content_writing"],
                depends_on: &[],
            },
            Stage {
                action: "write_launch_ads",
                description: "Write ad copy for the launch",
                capabilities: &["ad_copy"],
                depends_on: &[],
            },
            Stage {
                action: "launch_campaign",
                description: "Coordinate the launch campaign across announcement and ads",
                capabilities: &["campaign_launch"],
                depends_on: &[0, 1],
            },
        ],
    },
];

/// Lowercased alphanumeric word tokens of a request.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Build the step graph for a request. Pure: no provider calls.
pub fn build_plan(
    task_id: Uuid,
    description: &str,
    analysis: TaskAnalysis,
    roster: &Roster,
) -> CadreResult<OrchestrationPlan> {
    if analysis.required_agent_ids.is_empty() {
        return Err(CadreError::Planning(
            "analysis selected no agents for this request".into(),
        ));
    }

    let candidates: Vec<&Agent> = analysis
        .required_agent_ids
        .iter()
        .map(|id| {
            roster
                .get(id)
                .ok_or_else(|| CadreError::Planning(format!("agent '{id}' is not in the roster")))
        })
        .collect::<CadreResult<_>>()?;

    let tokens = tokenize(description);
    let steps = match RULES
        .iter()
        .find_map(|rule| staff_rule(rule, &tokens, &candidates).map(|agents| (rule, agents)))
    {
        Some((rule, agents)) => {
            info!(task_id = %task_id, rule = rule.name, "Plan matched pattern rule");
            rule_steps(rule, &agents, description)
        }
        None => {
            let agent = best_agent(&candidates, &tokens);
            info!(task_id = %task_id, agent = %agent.id, "No pattern rule matched, single-step plan");
            vec![WorkflowStep::new(
                StepId(1),
                agent.id.clone(),
                "handle_request",
                description.trim(),
            )]
        }
    };

    let requires_collation = steps.len() > 1;
    let estimated_cost = estimate_cost(&steps, roster, requires_collation);

    let plan = OrchestrationPlan {
        task_id,
        analysis,
        steps,
        requires_collation,
        estimated_cost,
    };
    plan.validate()?;

    debug!(
        task_id = %task_id,
        steps = plan.steps.len(),
        requires_collation,
        estimated_cost,
        "Plan built"
    );
    Ok(plan)
}

/// Agents for each stage of `rule`, or `None` if the rule does not apply.
fn staff_rule<'a>(
    rule: &PatternRule,
    tokens: &HashSet<String>,
    candidates: &[&'a Agent],
) -> Option<Vec<&'a Agent>> {
    let matches = rule
        .groups
        .iter()
        .all(|group| group.iter().any(|word| tokens.contains(*word)));
    if !matches {
        return None;
    }
    rule.stages
        .iter()
        .map(|stage| {
            candidates
                .iter()
                .copied()
                .find(|agent| agent.has_any_capability(stage.capabilities))
        })
        .collect()
}

fn rule_steps(rule: &PatternRule, agents: &[&Agent], description: &str) -> Vec<WorkflowStep> {
    rule.stages
        .iter()
        .zip(agents)
        .enumerate()
        .map(|(i, (stage, agent))| {
            WorkflowStep::new(
                step_id(i),
                agent.id.clone(),
                stage.action,
                format!("{}: {}", stage.description, description.trim()),
            )
            .with_dependencies(stage.depends_on.iter().map(|&d| step_id(d)))
        })
        .collect()
}

fn step_id(index: usize) -> StepId {
    StepId(index as u32 + 1)
}

/// Agent whose capability words overlap the request most; ties keep analysis order.
fn best_agent<'a>(candidates: &[&'a Agent], tokens: &HashSet<String>) -> &'a Agent {
    let mut best = candidates[0];
    let mut best_score = overlap(best, tokens);
    for &agent in &candidates[1..] {
        let score = overlap(agent, tokens);
        if score > best_score {
            best = agent;
            best_score = score;
        }
    }
    best
}

fn overlap(agent: &Agent, tokens: &HashSet<String>) -> usize {
    agent
        .capabilities
        .iter()
        .flat_map(|cap| cap.split('_'))
        .filter(|word| tokens.contains(*word))
        .count()
}

fn estimate_cost(steps: &[WorkflowStep], roster: &Roster, requires_collation: bool) -> f64 {
    let steps_cost: f64 = steps
        .iter()
        .map(|s| roster.get(&s.agent_id).map_or(1.0, |a| a.cost_weight) * STEP_BASE_COST)
        .sum();
    if requires_collation {
        steps_cost + COLLATION_COST
    } else {
        steps_cost
    }
}
