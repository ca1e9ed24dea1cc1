use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use cadre_orchestrator::{
    AgentActivity, AgentStats, ExportFormat, Orchestrator, Priority, WorkflowExecution,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_ACTIVITY_LIMIT: usize = 20;

/// Shared application state.
pub struct AppState {
    /// The engine every handler talks to.
    pub orchestrator: Arc<Orchestrator>,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router with all task and agent routes.
    pub fn build(orchestrator: Arc<Orchestrator>) -> Router {
        let state = Arc::new(AppState { orchestrator });

        Router::new()
            .route("/health", get(health_handler))
            .route("/tasks", post(submit_handler))
            .route("/tasks/{id}", get(task_handler))
            .route("/tasks/{id}/export", get(export_handler))
            .route("/agents", get(agents_handler))
            .route("/agents/{id}/activities", get(activities_handler))
            .route("/agents/{id}/status", get(agent_status_handler))
            .with_state(state)
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Deserialize)]
pub struct SubmitTask {
    /// The request in plain language.
    pub description: String,
    /// Defaults to normal.
    #[serde(default)]
    pub priority: Priority,
}

/// Reply to an accepted submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskAccepted {
    /// Id to poll.
    pub task_id: Uuid,
    /// Always `analyzing` at acceptance.
    pub status: String,
}

/// Query of `GET /tasks/{id}/export`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `markdown` (default), `md` or `json`.
    pub format: Option<String>,
}

/// Query of `GET /agents/{id}/activities`.
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    /// Maximum entries, newest first.
    pub limit: Option<usize>,
}

/// One roster entry as listed by `GET /agents`.
#[derive(Debug, Serialize)]
pub struct AgentSummary {
    /// Roster key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role title.
    pub role: String,
    /// Team.
    pub department: String,
    /// Capability tags, sorted.
    pub capabilities: Vec<String>,
    /// Whether the agent looks busy right now.
    pub working: bool,
}

/// Reply of `GET /agents/{id}/status`.
#[derive(Debug, Serialize)]
pub struct AgentStatus {
    /// Roster key.
    pub agent_id: String,
    /// Whether the agent looks busy right now.
    pub working: bool,
    /// Completed and failed step counts.
    pub stats: AgentStats,
    /// Most recent activity, if any.
    pub last_activity: Option<AgentActivity>,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "cadre",
        "agents": state.orchestrator.roster().len(),
    }))
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitTask>,
) -> Result<impl IntoResponse, ApiError> {
    if body.description.trim().is_empty() {
        return Err(ApiError::bad_request("description must not be empty"));
    }

    let task = state
        .orchestrator
        .create_task(&body.description, body.priority);
    let accepted = TaskAccepted {
        task_id: task.id,
        status: "analyzing".to_string(),
    };
    info!(task_id = %task.id, "Task accepted over HTTP");

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run_task(task, None).await;
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

fn lookup(state: &AppState, id: Uuid) -> Result<WorkflowExecution, ApiError> {
    state
        .orchestrator
        .status(id)
        .ok_or_else(|| ApiError::not_found(format!("task {id}")))
}

async fn task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowExecution>, ApiError> {
    lookup(&state, id).map(Json)
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };
    let execution = lookup(&state, id)?;
    let body = format.render(&execution)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body))
}

async fn agents_handler(State(state): State<Arc<AppState>>) -> Json<Vec<AgentSummary>> {
    let tracker = state.orchestrator.tracker();
    let agents = state
        .orchestrator
        .roster()
        .agents()
        .iter()
        .map(|a| AgentSummary {
            id: a.id.clone(),
            name: a.name.clone(),
            role: a.role.clone(),
            department: a.department.clone(),
            capabilities: a.capabilities.iter().cloned().collect(),
            working: tracker.is_agent_working(&a.id),
        })
        .collect();
    Json(agents)
}

fn known_agent(state: &AppState, id: &str) -> Result<(), ApiError> {
    if state.orchestrator.roster().contains(id) {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("agent '{id}'")))
    }
}

async fn activities_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<AgentActivity>>, ApiError> {
    known_agent(&state, &id)?;
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Ok(Json(
        state.orchestrator.tracker().agent_activities(&id, limit),
    ))
}

async fn agent_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentStatus>, ApiError> {
    known_agent(&state, &id)?;
    let tracker = state.orchestrator.tracker();
    Ok(Json(AgentStatus {
        working: tracker.is_agent_working(&id),
        stats: tracker.agent_stats(&id),
        last_activity: tracker.agent_activities(&id, 1).into_iter().next(),
        agent_id: id,
    }))
}
