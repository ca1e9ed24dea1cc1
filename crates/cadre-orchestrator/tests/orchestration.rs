#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use cadre_agent::{CompletionGateway, CompletionRequest, CompletionResponse};
use cadre_core::CadreError;
use cadre_orchestrator::{
    default_roster, ActivityKind, ActivityTracker, Complexity, ExecutionStatus, ExecutionStrategy,
    Executor, OrchestrationPlan, Orchestrator, OrchestratorConfig, Priority, ProgressFn, Roster,
    StepId, StepRunner, StepStatus, Task, TaskAnalysis, WorkflowExecution, WorkflowStep,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Gateway double answering by caller role, recording every request.
struct Scripted {
    by_role: HashMap<String, CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Scripted {
    fn new(entries: &[(&str, CompletionResponse)]) -> Arc<Self> {
        Arc::new(Self {
            by_role: entries
                .iter()
                .map(|(role, resp)| (role.to_string(), resp.clone()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests_for(&self, role: &str) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.role == role)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionGateway for Scripted {
    async fn complete(&self, request: CompletionRequest) -> CompletionResponse {
        let reply = self
            .by_role
            .get(&request.role)
            .cloned()
            .unwrap_or_else(|| CompletionResponse::failure(format!("no script for {}", request.role)));
        self.requests.lock().push(request);
        reply
    }
}

fn analysis_reply(agents: &[&str]) -> CompletionResponse {
    let agents: Vec<String> = agents.iter().map(|a| format!("\"{a}\"")).collect();
    CompletionResponse::ok(format!(
        r#"{{"complexity": "moderate", "required_agents": [{}],
            "execution_strategy": "sequential", "phases": [], "rationale": "scripted"}}"#,
        agents.join(", ")
    ))
}

fn orchestrator(gateway: Arc<Scripted>) -> Orchestrator {
    Orchestrator::new(
        &OrchestratorConfig::default(),
        Roster::new(default_roster("claude")).unwrap(),
        gateway,
    )
}

fn recorder() -> (ProgressFn, Arc<Mutex<Vec<WorkflowExecution>>>) {
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let sink = snapshots.clone();
    let f: ProgressFn = Arc::new(move |e: &WorkflowExecution| sink.lock().push(e.clone()));
    (f, snapshots)
}

fn assert_monotonic(snapshots: &[WorkflowExecution]) {
    for pair in snapshots.windows(2) {
        assert!(
            pair[1].progress >= pair[0].progress,
            "progress went from {} to {}",
            pair[0].progress,
            pair[1].progress
        );
    }
}

#[tokio::test]
async fn lead_failure_skips_outreach_and_fails_collation() {
    let gateway = Scripted::new(&[
        ("task analyzer", analysis_reply(&["lead-hunter", "outreach-writer"])),
        (
            "Lead discovery specialist",
            CompletionResponse::failure("upstream 500"),
        ),
        ("Outreach copywriter", CompletionResponse::ok("unused")),
    ]);
    let orch = orchestrator(gateway.clone());
    let (observer, snapshots) = recorder();

    let exec = orch
        .submit_with_observer(
            "find leads then write outreach emails",
            Priority::Normal,
            observer,
        )
        .await;

    assert_eq!(exec.step_results.len(), 2);
    assert_eq!(exec.step_results[&StepId(1)].status, StepStatus::Failed);
    assert_eq!(exec.step_results[&StepId(2)].status, StepStatus::Skipped);
    assert!(exec.step_results[&StepId(2)]
        .dependencies
        .contains(&StepId(1)));
    assert_eq!(exec.status, ExecutionStatus::Failed);
    assert!(exec.error.as_deref().unwrap().starts_with("Collation error"));
    assert!(gateway.requests_for("Outreach copywriter").is_empty());
    assert!(gateway.requests_for("collator").is_empty());

    let snaps = snapshots.lock();
    assert!(snaps.iter().any(|s| s.status == ExecutionStatus::Collating));
    assert_eq!(snaps.last().unwrap().status, ExecutionStatus::Failed);
    assert_monotonic(&snaps);
    assert_eq!(orch.status(exec.task_id).unwrap().status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn lead_outreach_success_is_collated() {
    let gateway = Scripted::new(&[
        ("task analyzer", analysis_reply(&["lead-hunter", "outreach-writer"])),
        (
            "Lead discovery specialist",
            CompletionResponse::ok("Acme Corp, VP Sales"),
        ),
        (
            "Outreach copywriter",
            CompletionResponse::ok("Subject: quick idea for Acme"),
        ),
        (
            "collator",
            CompletionResponse::ok(
                r#"{"executive_summary": "One lead, one email",
                    "key_findings": ["Acme is a fit"], "full_report": ""}"#,
            ),
        ),
    ]);
    let orch = orchestrator(gateway.clone());
    let (observer, snapshots) = recorder();

    let exec = orch
        .submit_with_observer("find leads then write outreach emails", Priority::High, observer)
        .await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.progress, 100);
    let deliverable = exec.final_deliverable.as_ref().unwrap();
    assert_eq!(deliverable.executive_summary, "One lead, one email");
    assert_eq!(deliverable.metadata.total_agents, 2);
    assert!(deliverable.full_report.contains("## Lead Hunter\n\nAcme Corp, VP Sales"));

    let outreach = gateway.requests_for("Outreach copywriter");
    assert_eq!(
        outreach[0].context.get("Lead Hunter").map(String::as_str),
        Some("Acme Corp, VP Sales")
    );
    let collation = gateway.requests_for("collator");
    assert!(collation[0].task.contains("Subject: quick idea for Acme"));

    let snaps = snapshots.lock();
    let statuses: Vec<ExecutionStatus> = snaps.iter().map(|s| s.status).collect();
    assert_eq!(statuses.first(), Some(&ExecutionStatus::Analyzing));
    assert!(statuses.contains(&ExecutionStatus::Planning));
    assert!(statuses.contains(&ExecutionStatus::Executing));
    assert!(statuses.contains(&ExecutionStatus::Collating));
    assert_eq!(statuses.last(), Some(&ExecutionStatus::Completed));
    assert_monotonic(&snaps);
}

#[tokio::test]
async fn unmatched_request_wraps_single_output_verbatim() {
    let report = "## Metrics\n\n- activation rate\n- weekly retention\n";
    let gateway = Scripted::new(&[
        ("task analyzer", analysis_reply(&["growth-analyst"])),
        ("Marketing analytics lead", CompletionResponse::ok(report)),
    ]);
    let orch = orchestrator(gateway.clone());

    let exec = orch
        .submit("Which metrics matter for onboarding?", Priority::Normal)
        .await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.step_results.len(), 1);
    let step = &exec.step_results[&StepId(1)];
    assert!(step.dependencies.is_empty());
    let deliverable = exec.final_deliverable.unwrap();
    assert_eq!(deliverable.full_report, report);
    assert_eq!(deliverable.metadata.total_agents, 1);
    assert!(gateway.requests_for("collator").is_empty());
}

#[tokio::test]
async fn product_launch_fans_in_both_outputs() {
    let gateway = Scripted::new(&[
        (
            "task analyzer",
            analysis_reply(&["content-writer", "ad-copywriter", "campaign-manager"]),
        ),
        ("Long-form content writer", CompletionResponse::ok("Post draft")),
        ("Paid media copywriter", CompletionResponse::ok("Ad variants")),
        ("Paid campaign manager", CompletionResponse::ok("Launch plan")),
        (
            "collator",
            CompletionResponse::ok(r#"{"executive_summary": "Launch ready"}"#),
        ),
    ]);
    let orch = orchestrator(gateway.clone());
    let (observer, snapshots) = recorder();

    let exec = orch
        .submit_with_observer("Announce the launch of v2", Priority::Urgent, observer)
        .await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    let manager = gateway.requests_for("Paid campaign manager");
    assert_eq!(manager[0].context.len(), 2);
    assert!(manager[0].context.contains_key("Content Writer"));
    assert!(manager[0].context.contains_key("Ad Copywriter"));

    let snaps = snapshots.lock();
    let status_of = |s: &WorkflowExecution, n: u32| s.step_results.get(&StepId(n)).map(|st| st.status);
    assert!(snaps.iter().any(|s| {
        status_of(s, 1) == Some(StepStatus::InProgress)
            && status_of(s, 2) == Some(StepStatus::InProgress)
            && status_of(s, 3) == Some(StepStatus::Pending)
    }));
}

#[tokio::test]
async fn activity_feed_streams_step_lifecycle() {
    let gateway = Scripted::new(&[
        ("task analyzer", analysis_reply(&["growth-analyst"])),
        ("Marketing analytics lead", CompletionResponse::ok("done")),
    ]);
    let orch = orchestrator(gateway);
    let mut feed = orch.tracker().subscribe();

    orch.submit("Summarize funnel health", Priority::Low).await;

    let mut kinds = Vec::new();
    while let Ok(activity) = feed.try_recv() {
        assert_eq!(activity.agent_id, "growth-analyst");
        kinds.push(activity.kind);
    }
    assert_eq!(kinds.first(), Some(&ActivityKind::Started));
    assert_eq!(kinds.last(), Some(&ActivityKind::Completed));
    assert!(!orch.tracker().is_agent_working("growth-analyst"));
    assert_eq!(orch.tracker().agent_stats("growth-analyst").completed, 1);
}

/// Every call waits until three calls are in flight at once.
struct Rendezvous {
    barrier: Barrier,
}

#[async_trait]
impl CompletionGateway for Rendezvous {
    async fn complete(&self, request: CompletionRequest) -> CompletionResponse {
        match tokio::time::timeout(Duration::from_secs(5), self.barrier.wait()).await {
            Ok(_) => CompletionResponse::ok(format!("{} done", request.role)),
            Err(_) => CompletionResponse::failure("steps did not run concurrently"),
        }
    }
}

fn hand_plan(task: &Task, steps: Vec<WorkflowStep>) -> OrchestrationPlan {
    OrchestrationPlan {
        task_id: task.id,
        analysis: TaskAnalysis {
            complexity: Complexity::Complex,
            required_agent_ids: steps.iter().map(|s| s.agent_id.clone()).collect(),
            execution_strategy: ExecutionStrategy::Parallel,
            phases: Vec::new(),
            rationale: String::new(),
        },
        steps,
        requires_collation: true,
        estimated_cost: 0.0,
    }
}

fn executor(gateway: Arc<dyn CompletionGateway>) -> Executor {
    let roster = Arc::new(Roster::new(default_roster("claude")).unwrap());
    Executor::new(
        StepRunner::new(gateway, Arc::new(ActivityTracker::new())),
        roster,
    )
}

#[tokio::test]
async fn independent_steps_run_in_one_wave() {
    let exec = executor(Arc::new(Rendezvous {
        barrier: Barrier::new(3),
    }));
    let task = Task::new("three independent jobs");
    let plan = hand_plan(
        &task,
        vec![
            WorkflowStep::new(StepId(1), "seo-strategist", "a", "x"),
            WorkflowStep::new(StepId(2), "ad-copywriter", "b", "x"),
            WorkflowStep::new(StepId(3), "growth-analyst", "c", "x"),
        ],
    );
    let mut run = WorkflowExecution::new(&task);
    let (observer, snapshots) = recorder();

    exec.execute(&plan, &mut run, &*observer).await.unwrap();

    assert_eq!(run.count_steps(StepStatus::Completed), 3);
    let snaps = snapshots.lock();
    let first_terminal = snaps
        .iter()
        .position(|s| s.step_results.values().any(|st| st.status.is_terminal()))
        .unwrap();
    assert!(snaps[..first_terminal]
        .iter()
        .any(|s| s.count_steps(StepStatus::InProgress) == 3));
}

#[tokio::test]
async fn cyclic_plan_never_starts_a_step() {
    let gateway = Scripted::new(&[]);
    let exec = executor(gateway.clone());
    let task = Task::new("cycle");
    let plan = hand_plan(
        &task,
        vec![
            WorkflowStep::new(StepId(1), "seo-strategist", "a", "x").with_dependencies([StepId(3)]),
            WorkflowStep::new(StepId(2), "ad-copywriter", "b", "x").with_dependencies([StepId(1)]),
            WorkflowStep::new(StepId(3), "growth-analyst", "c", "x").with_dependencies([StepId(2)]),
        ],
    );
    let mut run = WorkflowExecution::new(&task);
    let (observer, snapshots) = recorder();

    let err = exec.execute(&plan, &mut run, &*observer).await.unwrap_err();

    match err {
        CadreError::SchedulingDeadlock { stuck } => assert_eq!(stuck.len(), 3),
        other => panic!("expected deadlock, got {other}"),
    }
    assert!(gateway.requests.lock().is_empty());
    assert!(snapshots
        .lock()
        .iter()
        .all(|s| s.count_steps(StepStatus::InProgress) == 0));
}
