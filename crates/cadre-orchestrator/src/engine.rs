use crate::activity::ActivityTracker;
use crate::analyzer::TaskAnalyzer;
use crate::collator::{wrap_single, Collator};
use crate::config::OrchestratorConfig;
use crate::executor::{Executor, ProgressFn};
use crate::planner::build_plan;
use crate::roster::Roster;
use crate::runner::StepRunner;
use crate::types::{
    Deliverable, ExecutionStatus, OrchestrationPlan, Priority, StepStatus, Task, WorkflowExecution,
};
use cadre_agent::CompletionGateway;
use cadre_core::{CadreError, CadreResult};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

const ANALYZING_PROGRESS: u8 = 5;
const PLANNING_PROGRESS: u8 = 15;
const COLLATING_PROGRESS: u8 = 90;

/// Latest snapshot per task. Finished runs beyond `retained` are evicted
/// oldest first; runs still in flight are never evicted.
struct ExecutionStore {
    snapshots: HashMap<Uuid, WorkflowExecution>,
    finished: VecDeque<Uuid>,
    retained: usize,
}

impl ExecutionStore {
    fn new(retained: usize) -> Self {
        Self {
            snapshots: HashMap::new(),
            finished: VecDeque::new(),
            retained: retained.max(1),
        }
    }

    fn get(&self, task_id: &Uuid) -> Option<&WorkflowExecution> {
        self.snapshots.get(task_id)
    }

    fn insert(&mut self, snapshot: WorkflowExecution) {
        let task_id = snapshot.task_id;
        let now_finished = snapshot.status.is_finished();
        let was_finished = self
            .snapshots
            .insert(task_id, snapshot)
            .is_some_and(|prev| prev.status.is_finished());
        if now_finished && !was_finished {
            self.finished.push_back(task_id);
            while self.finished.len() > self.retained {
                if let Some(evicted) = self.finished.pop_front() {
                    self.snapshots.remove(&evicted);
                }
            }
        }
    }
}

/// The orchestration engine.
/// Implements the analyze → plan → execute → collate pipeline.
pub struct Orchestrator {
    roster: Arc<Roster>,
    tracker: Arc<ActivityTracker>,
    analyzer: TaskAnalyzer,
    collator: Collator,
    executor: Executor,
    executions: RwLock<ExecutionStore>,
}

impl Orchestrator {
    /// Create an orchestrator with its own activity tracker.
    pub fn new(
        config: &OrchestratorConfig,
        roster: Roster,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        let tracker = Arc::new(ActivityTracker::with_limits(
            config.activity_history,
            config.working_window_secs,
        ));
        Self::with_tracker(config, roster, gateway, tracker)
    }

    /// Create with an externally owned activity tracker.
    pub fn with_tracker(
        config: &OrchestratorConfig,
        roster: Roster,
        gateway: Arc<dyn CompletionGateway>,
        tracker: Arc<ActivityTracker>,
    ) -> Self {
        let roster = Arc::new(roster);
        let runner = StepRunner::new(gateway.clone(), tracker.clone());
        Self {
            analyzer: TaskAnalyzer::new(gateway.clone(), &config.analyzer_provider),
            collator: Collator::new(gateway, &config.collator_provider),
            executor: Executor::new(runner, roster.clone()),
            roster,
            tracker,
            executions: RwLock::new(ExecutionStore::new(config.retained_executions)),
        }
    }

    /// The roster every run is planned against.
    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    /// The shared activity tracker.
    pub fn tracker(&self) -> &Arc<ActivityTracker> {
        &self.tracker
    }

    /// Register a task and its initial snapshot without running it.
    pub fn create_task(&self, description: &str, priority: Priority) -> Task {
        let task = Task::new(description).with_priority(priority);
        self.executions.write().insert(WorkflowExecution::new(&task));
        info!(task_id = %task.id, priority = ?priority, "Task created");
        task
    }

    /// Latest snapshot of a task, if it is known.
    pub fn status(&self, task_id: Uuid) -> Option<WorkflowExecution> {
        self.executions.read().get(&task_id).cloned()
    }

    /// Create and run a task to completion.
    pub async fn submit(&self, description: &str, priority: Priority) -> WorkflowExecution {
        let task = self.create_task(description, priority);
        self.run_task(task, None).await
    }

    /// Like [`submit`](Self::submit), calling `observer` with every snapshot.
    pub async fn submit_with_observer(
        &self,
        description: &str,
        priority: Priority,
        observer: ProgressFn,
    ) -> WorkflowExecution {
        let task = self.create_task(description, priority);
        self.run_task(task, Some(observer)).await
    }

    /// Run the full pipeline for a created task.
    ///
    /// Never returns an error: a phase failure is recorded on the returned
    /// execution with `status = failed`. Every snapshot is stored before
    /// `observer` sees it.
    pub async fn run_task(&self, task: Task, observer: Option<ProgressFn>) -> WorkflowExecution {
        let start = Instant::now();
        let publish = |snapshot: &WorkflowExecution| {
            self.executions.write().insert(snapshot.clone());
            if let Some(observer) = &observer {
                observer(snapshot);
            }
        };

        info!(task_id = %task.id, "Orchestrator: starting pipeline");
        let mut execution = WorkflowExecution::new(&task);
        execution.advance(ExecutionStatus::Analyzing, ANALYZING_PROGRESS);
        publish(&execution);

        match self.drive(&task, &mut execution, &publish).await {
            Ok(deliverable) => {
                execution.finish(deliverable);
                info!(
                    task_id = %task.id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    completed = execution.count_steps(StepStatus::Completed),
                    "Orchestrator: pipeline complete"
                );
            }
            Err(e) => {
                error!(
                    task_id = %task.id,
                    phase = %execution.status,
                    phase_failure = e.is_phase_failure(),
                    error = %e,
                    "Orchestrator: pipeline failed"
                );
                execution.fail(&e);
            }
        }
        publish(&execution);
        execution
    }

    async fn drive(
        &self,
        task: &Task,
        execution: &mut WorkflowExecution,
        publish: &(dyn Fn(&WorkflowExecution) + Send + Sync),
    ) -> CadreResult<Deliverable> {
        let analysis = self.analyzer.analyze(&task.description, &self.roster).await?;

        execution.advance(ExecutionStatus::Planning, PLANNING_PROGRESS);
        publish(execution);
        let plan = build_plan(task.id, &task.description, analysis, &self.roster)?;
        execution.estimated_cost = Some(plan.estimated_cost);
        info!(
            task_id = %task.id,
            steps = plan.steps.len(),
            requires_collation = plan.requires_collation,
            estimated_cost = plan.estimated_cost,
            "Orchestrator: plan complete"
        );

        self.executor.execute(&plan, execution, publish).await?;

        execution.advance(ExecutionStatus::Collating, COLLATING_PROGRESS);
        publish(execution);
        self.deliver(task, &plan, execution).await
    }

    async fn deliver(
        &self,
        task: &Task,
        plan: &OrchestrationPlan,
        execution: &WorkflowExecution,
    ) -> CadreResult<Deliverable> {
        let outputs: Vec<(String, String)> = plan
            .steps
            .iter()
            .filter_map(|s| execution.step_results.get(&s.id))
            .filter(|s| s.status == StepStatus::Completed)
            .filter_map(|s| {
                s.output
                    .clone()
                    .map(|out| (self.roster.name_of(&s.agent_id).to_string(), out))
            })
            .collect();

        let complexity = plan.analysis.complexity;
        if plan.requires_collation {
            return self
                .collator
                .collate(&task.description, &outputs, complexity)
                .await;
        }
        match outputs.first() {
            Some((name, output)) => Ok(wrap_single(&task.description, name, output, complexity)),
            None => Err(CadreError::Collation(
                "the only step did not succeed".into(),
            )),
        }
    }
}
