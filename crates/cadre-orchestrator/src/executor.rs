use crate::roster::Roster;
use crate::runner::StepRunner;
use crate::types::{
    ExecutionStatus, OrchestrationPlan, StepId, StepStatus, WorkflowExecution, WorkflowStep,
};
use cadre_core::{CadreError, CadreResult};
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Observer invoked with a snapshot at every visible state change.
///
/// Runs synchronously on the orchestration task and must not block.
pub type ProgressFn = Arc<dyn Fn(&WorkflowExecution) + Send + Sync>;

const EXECUTING_START: u8 = 20;
const EXECUTING_SPAN: usize = 70;

/// Wave scheduler: runs every ready step of a plan concurrently, waits for
/// the whole wave, then computes the next one.
pub struct Executor {
    runner: StepRunner,
    roster: Arc<Roster>,
}

impl Executor {
    /// Executor dispatching through `runner`, resolving agents in `roster`.
    pub fn new(runner: StepRunner, roster: Arc<Roster>) -> Self {
        Self { runner, roster }
    }

    /// Execute `plan`, recording every step into `execution.step_results`.
    ///
    /// Step failures are absorbed: the failed step is recorded and its
    /// dependents are skipped. Only a plan that can never finish returns an
    /// error, and a cyclic plan is rejected before any step starts.
    pub async fn execute(
        &self,
        plan: &OrchestrationPlan,
        execution: &mut WorkflowExecution,
        on_progress: &(dyn Fn(&WorkflowExecution) + Send + Sync),
    ) -> CadreResult<()> {
        if let Some(cycle) = plan.find_cycle() {
            return Err(CadreError::SchedulingDeadlock {
                stuck: cycle.iter().map(ToString::to_string).collect(),
            });
        }

        let task_id = plan.task_id;
        let order: Vec<StepId> = plan.steps.iter().map(|s| s.id).collect();
        let total = order.len();
        execution.step_results = plan.steps.iter().map(|s| (s.id, s.clone())).collect();
        execution.advance(ExecutionStatus::Executing, EXECUTING_START);
        on_progress(execution);

        let mut resolved: HashSet<StepId> = HashSet::new();
        let mut succeeded: HashSet<StepId> = HashSet::new();
        let mut wave_no = 0usize;

        while resolved.len() < total {
            propagate_skips(&order, execution, &mut resolved, &succeeded);
            if resolved.len() == total {
                break;
            }

            let ready: Vec<StepId> = order
                .iter()
                .copied()
                .filter(|id| !resolved.contains(id))
                .filter(|id| {
                    execution
                        .step_results
                        .get(id)
                        .is_some_and(|s| s.is_ready(&succeeded))
                })
                .collect();

            if ready.is_empty() {
                let stuck: Vec<String> = order
                    .iter()
                    .filter(|id| !resolved.contains(id))
                    .map(ToString::to_string)
                    .collect();
                warn!(task_id = %task_id, stuck = ?stuck, "Scheduling deadlock");
                return Err(CadreError::SchedulingDeadlock { stuck });
            }

            wave_no += 1;
            let mut wave: Vec<(WorkflowStep, BTreeMap<String, String>)> = Vec::new();
            for id in &ready {
                let context = self.dependency_context(*id, execution);
                let Some(step) = execution.step_results.get_mut(id) else {
                    continue;
                };
                if self.roster.get(&step.agent_id).is_none() {
                    step.fail(format!("agent '{}' is not in the roster", step.agent_id));
                    resolved.insert(*id);
                    continue;
                }
                step.mark_in_progress();
                wave.push((step.clone(), context));
            }
            info!(task_id = %task_id, wave = wave_no, steps = wave.len(), "Dispatching wave");
            on_progress(execution);

            let finished = join_all(wave.into_iter().filter_map(|(step, context)| {
                let agent = self.roster.get(&step.agent_id)?;
                Some(self.runner.run_step(task_id, agent, step, context))
            }))
            .await;

            for step in finished {
                if step.status == StepStatus::Completed {
                    succeeded.insert(step.id);
                }
                resolved.insert(step.id);
                execution.step_results.insert(step.id, step);
            }

            execution.advance(ExecutionStatus::Executing, wave_progress(resolved.len(), total));
            on_progress(execution);
        }

        execution.advance(ExecutionStatus::Executing, wave_progress(total, total));
        info!(
            task_id = %task_id,
            completed = execution.count_steps(StepStatus::Completed),
            failed = execution.count_steps(StepStatus::Failed),
            skipped = execution.count_steps(StepStatus::Skipped),
            "All steps resolved"
        );
        Ok(())
    }

    /// Outputs of the step's succeeded dependencies keyed by agent name.
    fn dependency_context(
        &self,
        id: StepId,
        execution: &WorkflowExecution,
    ) -> BTreeMap<String, String> {
        let mut context = BTreeMap::new();
        let Some(step) = execution.step_results.get(&id) else {
            return context;
        };
        for dep in &step.dependencies {
            let Some(dep_step) = execution.step_results.get(dep) else {
                continue;
            };
            let Some(output) = dep_step.output.clone() else {
                continue;
            };
            let name = self.roster.name_of(&dep_step.agent_id).to_string();
            let key = if context.contains_key(&name) {
                format!("{name} ({dep})")
            } else {
                name
            };
            context.insert(key, output);
        }
        context
    }
}

/// Skip every unresolved step with a resolved but unsuccessful dependency,
/// repeating until nothing changes.
fn propagate_skips(
    order: &[StepId],
    execution: &mut WorkflowExecution,
    resolved: &mut HashSet<StepId>,
    succeeded: &HashSet<StepId>,
) {
    loop {
        let mut changed = false;
        for id in order {
            if resolved.contains(id) {
                continue;
            }
            let Some(step) = execution.step_results.get_mut(id) else {
                continue;
            };
            let blocked = step
                .dependencies
                .iter()
                .find(|dep| resolved.contains(*dep) && !succeeded.contains(*dep))
                .copied();
            if let Some(dep) = blocked {
                step.skip(format!("dependency {dep} did not succeed"));
                resolved.insert(*id);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn wave_progress(resolved: usize, total: usize) -> u8 {
    if total == 0 {
        return EXECUTING_START + EXECUTING_SPAN as u8;
    }
    (EXECUTING_START as usize + EXECUTING_SPAN * resolved / total) as u8
}
