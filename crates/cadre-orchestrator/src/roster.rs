use crate::types::{Agent, AgentId};
use cadre_core::{CadreError, CadreResult};
use std::collections::HashMap;

/// Read-only directory of agents, indexed by id, in declaration order.
#[derive(Debug, Clone)]
pub struct Roster {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl Roster {
    /// Build a roster, rejecting duplicate or empty ids.
    pub fn new(agents: Vec<Agent>) -> CadreResult<Self> {
        let mut index = HashMap::with_capacity(agents.len());
        for (pos, agent) in agents.iter().enumerate() {
            if agent.id.trim().is_empty() {
                return Err(CadreError::Config("agent id must not be empty".into()));
            }
            if index.insert(agent.id.clone(), pos).is_some() {
                return Err(CadreError::Config(format!(
                    "duplicate agent id '{}' in roster",
                    agent.id
                )));
            }
        }
        Ok(Self { agents, index })
    }

    /// Look up an agent by id.
    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.index.get(id).map(|&pos| &self.agents[pos])
    }

    /// Whether `id` is on the roster.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All agents in declaration order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the roster has no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Display name of an agent, falling back to its id.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |a| a.name.as_str())
    }

    /// One line per agent (`id | role | capabilities`) for analyzer prompts.
    pub fn summary(&self) -> String {
        self.agents
            .iter()
            .map(|a| {
                let caps: Vec<&str> = a.capabilities.iter().map(String::as_str).collect();
                format!("- {} | {} ({}) | {}", a.id, a.role, a.department, caps.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The built-in growth team used when no `[[agents]]` are configured.
pub fn default_roster(provider: &str) -> Vec<Agent> {
    vec![
        Agent::new(
            "lead-hunter",
            "Lead Hunter",
            "Lead discovery specialist",
            "Sales",
            provider,
        )
        .with_capabilities(&["lead_generation", "prospecting", "email_finding", "research"])
        .with_cost_weight(1.2)
        .with_instruction(LEAD_HUNTER_PROMPT),
        Agent::new(
            "outreach-writer",
            "Outreach Writer",
            "Outreach copywriter",
            "Sales",
            provider,
        )
        .with_capabilities(&["copywriting", "email", "outreach", "personalization"])
        .with_instruction(OUTREACH_PROMPT),
        Agent::new(
            "seo-strategist",
            "SEO Strategist",
            "Search optimization strategist",
            "Marketing",
            provider,
        )
        .with_capabilities(&["seo", "keyword_research", "content_strategy"])
        .with_instruction(SEO_PROMPT),
        Agent::new(
            "content-writer",
            "Content Writer",
            "Long-form content writer",
            "Marketing",
            provider,
        )
        .with_capabilities(&["content_writing", "blog", "editing", "storytelling"])
        .with_cost_weight(1.5)
        .with_instruction(CONTENT_PROMPT),
        Agent::new(
            "ad-copywriter",
            "Ad Copywriter",
            "Paid media copywriter",
            "Marketing",
            provider,
        )
        .with_capabilities(&["ad_copy", "copywriting", "creative"])
        .with_instruction(AD_COPY_PROMPT),
        Agent::new(
            "campaign-manager",
            "Campaign Manager",
            "Paid campaign manager",
            "Marketing",
            provider,
        )
        .with_capabilities(&["campaign_launch", "advertising", "media_buying", "budgeting"])
        .with_cost_weight(1.3)
        .with_instruction(CAMPAIGN_PROMPT),
        Agent::new(
            "growth-analyst",
            "Growth Analyst",
            "Marketing analytics lead",
            "Analytics",
            provider,
        )
        .with_capabilities(&["analytics", "measurement", "reporting", "research"])
        .with_cost_weight(0.8)
        .with_instruction(ANALYST_PROMPT),
    ]
}

const LEAD_HUNTER_PROMPT: &str = "\
You are the Lead Hunter on a growth team. You find companies and contacts \
that match an ideal customer profile.

Rules:
1. Describe the ideal customer profile you are targeting.
2. List concrete leads with company, contact role, and why they fit.
3. Note where each contact's email or channel can be found.
4. Never invent personal data; mark unknown fields as unknown.
";

const OUTREACH_PROMPT: &str = "\
You are the Outreach Writer on a growth team. You write short, personal \
outreach emails.

Rules:
1. Use the lead research you are given; reference specifics.
2. Keep each email under 150 words with one clear call to action.
3. Provide a subject line and a follow-up for every email.
";

const SEO_PROMPT: &str = "\
You are the SEO Strategist on a growth team. You research keywords and \
search intent.

Rules:
1. Propose primary and secondary keywords with intent and difficulty.
2. Suggest titles, headings, and internal links.
3. Flag keyword cannibalization risks.
";

const CONTENT_PROMPT: &str = "\
You are the Content Writer on a growth team. You write clear long-form \
articles.

Rules:
1. Follow any keyword brief you are given.
2. Structure the piece with headings and a strong introduction.
3. End with a call to action that fits the audience.
";

const AD_COPY_PROMPT: &str = "\
You are the Ad Copywriter on a growth team. You write paid ad variants.

Rules:
1. Produce several headline and body variants per channel.
2. Respect channel character limits.
3. State the angle each variant tests.
";

const CAMPAIGN_PROMPT: &str = "\
You are the Campaign Manager on a growth team. You turn creative into a \
launch plan.

Rules:
1. Define audiences, channels, budget split, and schedule.
2. Map each ad variant to an ad set.
3. List the tracking that must be in place before launch.
";

const ANALYST_PROMPT: &str = "\
You are the Growth Analyst on a growth team. You define how results are \
measured.

Rules:
1. Choose primary and guardrail metrics.
2. Set targets and the review cadence.
3. Describe the report the team will read after launch.
";
