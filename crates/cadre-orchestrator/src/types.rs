use cadre_core::{CadreError, CadreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an agent in the roster (e.g. `"lead-hunter"`).
pub type AgentId = String;

/// A role-bound task executor backed by a completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Stable roster key.
    pub id: AgentId,
    /// Display name, also the key under which its output is shared.
    pub name: String,
    /// Short role title passed to the provider.
    pub role: String,
    /// Team the agent belongs to.
    pub department: String,
    /// Capability tags matched by the plan builder.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Provider key used by the completion gateway.
    pub provider: String,
    /// Relative cost of one step run by this agent.
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f64,
    /// Role instruction sent as the system prompt.
    #[serde(default)]
    pub instruction: String,
}

fn default_cost_weight() -> f64 {
    1.0
}

impl Agent {
    /// Create an agent with no capabilities and unit cost.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        department: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            department: department.into(),
            capabilities: BTreeSet::new(),
            provider: provider.into(),
            cost_weight: default_cost_weight(),
            instruction: String::new(),
        }
    }

    /// Replace the capability set.
    pub fn with_capabilities(mut self, caps: &[&str]) -> Self {
        self.capabilities = caps.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Set the relative cost of one step.
    pub fn with_cost_weight(mut self, weight: f64) -> Self {
        self.cost_weight = weight;
        self
    }

    /// Set the role instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Whether the agent has at least one of `caps`.
    pub fn has_any_capability(&self, caps: &[&str]) -> bool {
        caps.iter().any(|c| self.capabilities.contains(*c))
    }
}

/// Scheduling priority attached to a submitted task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// The default.
    #[default]
    Normal,
    /// Ahead of normal work.
    High,
    /// Needs attention now.
    Urgent,
}

impl FromStr for Priority {
    type Err = CadreError;

    fn from_str(s: &str) -> CadreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(CadreError::Config(format!("unknown priority '{other}'"))),
        }
    }
}

/// A submitted work request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task id, also the execution key.
    pub id: Uuid,
    /// The request in plain language.
    pub description: String,
    /// Informational; there is no queue to reorder.
    #[serde(default)]
    pub priority: Priority,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a normal-priority task with a fresh id.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            priority: Priority::Normal,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// How much work the analyzer expects a request to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// One agent, one step.
    Simple,
    /// A short chain of agents.
    Moderate,
    /// Several agents across departments.
    Complex,
    /// Broad, multi-phase work.
    Enterprise,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Moderate => write!(f, "moderate"),
            Complexity::Complex => write!(f, "complex"),
            Complexity::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for Complexity {
    type Err = CadreError;

    fn from_str(s: &str) -> CadreResult<Self> {
        match s {
            "simple" => Ok(Complexity::Simple),
            "moderate" => Ok(Complexity::Moderate),
            "complex" => Ok(Complexity::Complex),
            "enterprise" => Ok(Complexity::Enterprise),
            other => Err(CadreError::Analysis(format!("unknown complexity '{other}'"))),
        }
    }
}

/// How the analyzer suggests running the selected agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// One after another.
    Sequential,
    /// All at once.
    Parallel,
    /// Some phases in parallel, some in sequence.
    Hybrid,
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategy::Sequential => write!(f, "sequential"),
            ExecutionStrategy::Parallel => write!(f, "parallel"),
            ExecutionStrategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = CadreError;

    fn from_str(s: &str) -> CadreResult<Self> {
        match s {
            "sequential" => Ok(ExecutionStrategy::Sequential),
            "parallel" => Ok(ExecutionStrategy::Parallel),
            "hybrid" => Ok(ExecutionStrategy::Hybrid),
            other => Err(CadreError::Analysis(format!(
                "unknown execution strategy '{other}'"
            ))),
        }
    }
}

/// A named group of agents proposed by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase label, referenced by `depends_on_phases`.
    pub name: String,
    /// Agents working in this phase.
    pub agent_ids: Vec<AgentId>,
    /// Phases that must finish first.
    #[serde(default)]
    pub depends_on_phases: Vec<String>,
}

/// The analyzer's decision about a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    /// Estimated complexity.
    pub complexity: Complexity,
    /// Ordered and free of duplicates.
    pub required_agent_ids: Vec<AgentId>,
    /// Suggested strategy.
    pub execution_strategy: ExecutionStrategy,
    /// Optional phase breakdown.
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// The analyzer's reasoning.
    pub rationale: String,
}

/// Index of a step within its plan, rendered as `step-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub u32);

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step-{}", self.0)
    }
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting on dependencies.
    Pending,
    /// Dispatched in the current wave.
    InProgress,
    /// Finished with output.
    Completed,
    /// The provider failed or returned nothing.
    Failed,
    /// A dependency did not succeed.
    Skipped,
}

impl StepStatus {
    /// Completed, failed and skipped steps are resolved.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::InProgress => write!(f, "in_progress"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// One agent's unit of work within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Position in the plan.
    pub id: StepId,
    /// Agent that runs the step.
    pub agent_id: AgentId,
    /// Short verb phrase, e.g. `discover_leads`.
    pub action: String,
    /// What the agent is asked to do.
    pub description: String,
    /// Steps whose output this step consumes.
    #[serde(default)]
    pub dependencies: BTreeSet<StepId>,
    /// Current lifecycle state.
    pub status: StepStatus,
    /// 0 to 100.
    pub progress: u8,
    /// Set only when completed.
    pub output: Option<String>,
    /// Failure or skip reason.
    pub error: Option<String>,
    /// When the step was first dispatched.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    /// Create a pending step with no dependencies.
    pub fn new(
        id: StepId,
        agent_id: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            agent_id: agent_id.into(),
            action: action.into(),
            description: description.into(),
            dependencies: BTreeSet::new(),
            status: StepStatus::Pending,
            progress: 0,
            output: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Replace the dependency set.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = StepId>) -> Self {
        self.dependencies = deps.into_iter().collect();
        self
    }

    /// Pending with every dependency in `succeeded`.
    pub fn is_ready(&self, succeeded: &HashSet<StepId>) -> bool {
        self.status == StepStatus::Pending
            && self.dependencies.iter().all(|dep| succeeded.contains(dep))
    }

    /// Dispatch the step, stamping `started_at` once.
    pub fn mark_in_progress(&mut self) {
        self.status = StepStatus::InProgress;
        self.started_at.get_or_insert_with(Utc::now);
    }

    /// Record a successful output.
    pub fn complete(&mut self, output: String) {
        self.status = StepStatus::Completed;
        self.progress = 100;
        self.output = Some(output);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    /// Record a failure.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Mark the step skipped with a reason.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Skipped;
        self.error = Some(reason.into());
        self.completed_at = Some(Utc::now());
    }
}

/// Steps plus metadata, built once and handed to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    /// Task the plan was built for.
    pub task_id: Uuid,
    /// The analysis the plan was built from.
    pub analysis: TaskAnalysis,
    /// Steps in declaration order.
    pub steps: Vec<WorkflowStep>,
    /// True when there is more than one step.
    pub requires_collation: bool,
    /// Sum of agent cost weights, plus collation.
    pub estimated_cost: f64,
}

impl OrchestrationPlan {
    /// Look up a step by id.
    pub fn step(&self, id: StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check ids are unique, dependencies point inside the plan, and the
    /// dependency relation is acyclic.
    pub fn validate(&self) -> CadreResult<()> {
        let mut ids = HashSet::new();
        for step in &self.steps {
            if !ids.insert(step.id) {
                return Err(CadreError::Planning(format!("duplicate step id {}", step.id)));
            }
        }
        for step in &self.steps {
            if let Some(missing) = step.dependencies.iter().find(|d| !ids.contains(d)) {
                return Err(CadreError::Planning(format!(
                    "{} depends on unknown step {missing}",
                    step.id
                )));
            }
        }
        if let Some(cycle) = self.find_cycle() {
            let names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            return Err(CadreError::Planning(format!(
                "dependency cycle through {}",
                names.join(" -> ")
            )));
        }
        Ok(())
    }

    /// Return the steps on the first dependency cycle found, if any.
    pub fn find_cycle(&self) -> Option<Vec<StepId>> {
        let graph: HashMap<StepId, &BTreeSet<StepId>> =
            self.steps.iter().map(|s| (s.id, &s.dependencies)).collect();
        let mut state: HashMap<StepId, u8> = HashMap::new();
        let mut path = Vec::new();
        for step in &self.steps {
            if dfs_cycle(step.id, &graph, &mut state, &mut path) {
                return Some(path);
            }
        }
        None
    }
}

fn dfs_cycle(
    id: StepId,
    graph: &HashMap<StepId, &BTreeSet<StepId>>,
    state: &mut HashMap<StepId, u8>,
    path: &mut Vec<StepId>,
) -> bool {
    match state.get(&id) {
        Some(1) => {
            // back edge: keep only the cycle itself
            if let Some(start) = path.iter().position(|p| *p == id) {
                path.drain(..start);
            }
            return true;
        }
        Some(2) => return false,
        _ => {}
    }
    state.insert(id, 1);
    path.push(id);
    if let Some(deps) = graph.get(&id) {
        for dep in deps.iter() {
            if dfs_cycle(*dep, graph, state, path) {
                return true;
            }
        }
    }
    path.pop();
    state.insert(id, 2);
    false
}

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Choosing agents.
    Analyzing,
    /// Building the step graph.
    Planning,
    /// Running waves of steps.
    Executing,
    /// Merging outputs into a deliverable.
    Collating,
    /// Deliverable ready.
    Completed,
    /// A phase failed; see `error`.
    Failed,
}

impl ExecutionStatus {
    /// Completed or failed.
    pub fn is_finished(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Analyzing => write!(f, "analyzing"),
            ExecutionStatus::Planning => write!(f, "planning"),
            ExecutionStatus::Executing => write!(f, "executing"),
            ExecutionStatus::Collating => write!(f, "collating"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The mutable record of one run, threaded through every phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Task being run.
    pub task_id: Uuid,
    /// Copy of the request.
    pub description: String,
    /// Current phase.
    pub status: ExecutionStatus,
    /// 0 to 100, never decreasing.
    pub progress: u8,
    /// Latest state of every step.
    pub step_results: BTreeMap<StepId, WorkflowStep>,
    /// Set on success.
    pub final_deliverable: Option<Deliverable>,
    /// Known once planning is done.
    pub estimated_cost: Option<f64>,
    /// When the run began.
    pub started_at: DateTime<Utc>,
    /// When the run finished either way.
    pub completed_at: Option<DateTime<Utc>>,
    /// Phase failure message.
    pub error: Option<String>,
}

impl WorkflowExecution {
    /// Fresh snapshot for `task` at progress 0.
    pub fn new(task: &Task) -> Self {
        Self {
            task_id: task.id,
            description: task.description.clone(),
            status: ExecutionStatus::Analyzing,
            progress: 0,
            step_results: BTreeMap::new(),
            final_deliverable: None,
            estimated_cost: None,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// Move to `status`; progress only ever moves forward.
    pub fn advance(&mut self, status: ExecutionStatus, progress: u8) {
        self.status = status;
        self.progress = self.progress.max(progress.min(100));
    }

    /// Record a phase failure, keeping step results.
    pub fn fail(&mut self, error: &CadreError) {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
    }

    /// Attach the deliverable and complete the run.
    pub fn finish(&mut self, deliverable: Deliverable) {
        self.final_deliverable = Some(deliverable);
        self.advance(ExecutionStatus::Completed, 100);
        self.completed_at = Some(Utc::now());
    }

    /// Number of steps currently in `status`.
    pub fn count_steps(&self, status: StepStatus) -> usize {
        self.step_results
            .values()
            .filter(|s| s.status == status)
            .count()
    }
}

/// One agent's part of the final deliverable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentContribution {
    /// Display name of the agent.
    pub agent_name: String,
    /// What the agent added.
    #[serde(default)]
    pub contribution: String,
    /// Notable points from its output.
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Facts about how a deliverable was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableMetadata {
    /// The original request.
    pub task_description: String,
    /// When the deliverable was assembled.
    pub completed_at: DateTime<Utc>,
    /// Distinct agents whose output was used.
    pub total_agents: usize,
    /// Complexity from the analysis.
    pub complexity: Complexity,
}

/// The single structured result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    /// A few sentences for a busy reader.
    pub executive_summary: String,
    /// Main findings.
    pub key_findings: Vec<String>,
    /// Per-agent breakdown.
    pub agent_contributions: Vec<AgentContribution>,
    /// Recommended actions.
    pub recommendations: Vec<String>,
    /// Concrete follow-ups.
    pub next_steps: Vec<String>,
    /// The complete merged report.
    pub full_report: String,
    /// Provenance.
    pub metadata: DeliverableMetadata,
}

/// What an agent is doing at the moment of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Picked up a step.
    Started,
    /// Preparing the request.
    Thinking,
    /// Waiting on the provider.
    Executing,
    /// Intermediate update.
    Progress,
    /// Step succeeded.
    Completed,
    /// Step failed.
    Failed,
}

impl ActivityKind {
    /// Completed or failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActivityKind::Completed | ActivityKind::Failed)
    }
}

/// An observability event emitted by an agent while working a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentActivity {
    /// Unique event id.
    pub id: Uuid,
    /// Agent that emitted the event.
    pub agent_id: AgentId,
    /// Task the agent was working on.
    pub task_id: Uuid,
    /// Event kind.
    pub kind: ActivityKind,
    /// Human-readable message.
    pub message: String,
    /// Step progress at the time, if known.
    pub progress: Option<u8>,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl AgentActivity {
    /// Create an event stamped now.
    pub fn new(
        agent_id: impl Into<String>,
        task_id: Uuid,
        kind: ActivityKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            task_id,
            kind,
            message: message.into(),
            progress: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a progress value, capped at 100.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }
}
