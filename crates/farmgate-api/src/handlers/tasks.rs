//! Task endpoint: creation, polling and model assignments

use axum::extract::State;
use axum::Json;
use farmgate_core::registry::{find_node_for_model, model_assignments, reconcile, ModelAssignments};
use farmgate_core::{GatewayError, GatewayResult, Task, TaskStatus};
use farmgate_transport::wire::{decode, AiRequest, ModelList};
use farmgate_transport::Operation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::models::run_inference;
use super::AddressRequest;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(flatten)]
    pub target: AddressRequest,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskCreated {
    pub success: bool,
    pub task_id: String,
    pub assigned_client: String,
}

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub success: bool,
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub result: Option<String>,
    pub client_id: String,
}

impl From<Task> for TaskStatusResponse {
    fn from(task: Task) -> Self {
        Self {
            success: true,
            progress: task.progress(),
            task_id: task.task_id,
            status: task.status,
            result: task.result,
            client_id: task.assigned_client,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub assignments: ModelAssignments,
}

/// POST /api/llm/task
pub async fn task(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let action = request.action.clone().unwrap_or_default();
    let body = match action.as_str() {
        "create_task" => to_value(create_task(&state, request).await?),
        "get_status" => to_value(get_status(&state, request).await?),
        "get_assignments" => to_value(get_assignments(&state, request).await?),
        "" => return Err(ApiError::bad_request("action is required")),
        other => return Err(ApiError::bad_request(format!("Unknown action: {}", other))),
    }?;
    Ok(Json(body))
}

fn to_value<T: Serialize>(body: T) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| GatewayError::Internal(e.to_string()).into())
}

fn required(field: &'static str, value: Option<String>) -> GatewayResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest(format!("{} is required", field)))
}

async fn create_task(state: &AppState, request: TaskRequest) -> GatewayResult<TaskCreated> {
    let model_name = required("model_name", request.model_name)?;
    let prompt = required("prompt", request.prompt)?;

    let assigned = match state.address(request.target.requested()) {
        Ok(address) => lookup_node(state, &address, &model_name).await,
        Err(_) => None,
    };

    let task = state.tracker.create(&model_name, &prompt, assigned);
    Ok(TaskCreated {
        success: true,
        task_id: task.task_id,
        assigned_client: task.assigned_client,
    })
}

/// Ask the registry which node hosts `model_name`. Any failure means "no answer".
async fn lookup_node(state: &AppState, address: &str, model_name: &str) -> Option<String> {
    let lookup = async {
        let resolved = state
            .resolver
            .call(address, Operation::GetAvailableModels, &json!({}))
            .await?;
        decode::<ModelList>(Operation::GetAvailableModels, resolved.body)
    };

    match lookup.await {
        Ok(list) => {
            let nodes = reconcile(&list.models);
            find_node_for_model(&nodes, model_name).map(|n| n.client_id.clone())
        }
        Err(e) => {
            tracing::debug!(model = %model_name, error = %e, "Registry lookup failed, using fallback client");
            None
        }
    }
}

/// Look up a task and, while it is still submitted, ask the control plane for its answer
async fn get_status(state: &AppState, request: TaskRequest) -> GatewayResult<TaskStatusResponse> {
    let task_id = required("task_id", request.task_id)?;
    let task = state.tracker.status(&task_id)?;
    if task.status.is_terminal() {
        return Ok(task.into());
    }

    let address = state.address(request.target.requested())?;
    let ai_request = AiRequest {
        request_id: task.task_id.clone(),
        model_name: task.model_name.clone(),
        prompt: task.prompt.clone(),
        parameters: Map::new(),
    };

    let updated = match run_inference(state, &address, &ai_request).await {
        Ok(response) => state.tracker.complete(&task_id, response.response_text),
        Err(GatewayError::ProtocolError(message)) => state.tracker.fail(&task_id, message),
        Err(e) => return Err(e),
    };

    // A concurrent poll may have finished the task first
    let task = match updated {
        Ok(task) => task,
        Err(_) => state.tracker.status(&task_id)?,
    };
    Ok(task.into())
}

async fn get_assignments(
    state: &AppState,
    request: TaskRequest,
) -> GatewayResult<AssignmentsResponse> {
    let address = state.address(request.target.requested())?;
    let resolved = state
        .resolver
        .call(&address, Operation::GetAvailableModels, &json!({}))
        .await?;
    let list: ModelList = decode(Operation::GetAvailableModels, resolved.body)?;

    Ok(AssignmentsResponse {
        success: true,
        assignments: model_assignments(&list.models),
    })
}
