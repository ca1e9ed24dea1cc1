use crate::activity::ActivityTracker;
use crate::types::{ActivityKind, Agent, AgentActivity, WorkflowStep};
use cadre_agent::{CompletionGateway, CompletionRequest};
use cadre_core::CadreError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Executes one step through the gateway and reports activities as it goes.
#[derive(Clone)]
pub struct StepRunner {
    gateway: Arc<dyn CompletionGateway>,
    tracker: Arc<ActivityTracker>,
}

impl StepRunner {
    /// Runner reporting to `tracker`.
    pub fn new(gateway: Arc<dyn CompletionGateway>, tracker: Arc<ActivityTracker>) -> Self {
        Self { gateway, tracker }
    }

    /// Run `step` as `agent`, returning it completed or failed.
    ///
    /// `context` holds the outputs of the step's resolved dependencies,
    /// keyed by the producing agent's name. Never returns an error: a
    /// provider failure or blank answer is recorded on the step.
    pub async fn run_step(
        &self,
        task_id: Uuid,
        agent: &Agent,
        mut step: WorkflowStep,
        context: BTreeMap<String, String>,
    ) -> WorkflowStep {
        let start = Instant::now();
        let emit = |kind: ActivityKind, message: String, progress: u8| {
            self.tracker.log(
                AgentActivity::new(&agent.id, task_id, kind, message).with_progress(progress),
            );
        };

        emit(
            ActivityKind::Started,
            format!("{} started {}", agent.name, step.action),
            0,
        );
        emit(
            ActivityKind::Thinking,
            format!("Preparing {} with {} context block(s)", step.id, context.len()),
            10,
        );

        let request = CompletionRequest::new(
            &agent.provider,
            &agent.role,
            &agent.instruction,
            format!(
                "## Action\n{}\n\n## Task\n{}",
                step.action, step.description
            ),
        )
        .with_context(context);

        emit(
            ActivityKind::Executing,
            format!("Calling provider '{}'", agent.provider),
            30,
        );
        let response = self.gateway.complete(request).await;
        emit(ActivityKind::Progress, "Response received".into(), 90);

        match response.into_content() {
            Ok(output) => {
                info!(
                    task_id = %task_id,
                    step = %step.id,
                    agent = %agent.id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Step completed"
                );
                emit(
                    ActivityKind::Completed,
                    format!("{} finished {}", agent.name, step.action),
                    100,
                );
                step.complete(output);
            }
            Err(e) => {
                let failure = CadreError::Step(e.to_string());
                warn!(
                    task_id = %task_id,
                    step = %step.id,
                    agent = %agent.id,
                    error = %failure,
                    "Step failed"
                );
                emit(ActivityKind::Failed, failure.to_string(), 100);
                step.fail(failure.to_string());
            }
        }
        step
    }
}
