//! System status handler

use axum::extract::State;
use axum::Json;
use farmgate_core::registry::system_status;
use farmgate_core::{ModelRecord, SystemStatus};
use farmgate_transport::wire::{decode, ModelList};
use farmgate_transport::Operation;
use serde::Serialize;
use serde_json::json;

use super::AddressRequest;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: SystemStatus,
    pub models: Vec<ModelRecord>,
    pub degraded: bool,
}

/// POST /api/grpc/status
///
/// Failures still carry an empty status so the dashboard can render.
pub async fn status(
    State(state): State<AppState>,
    payload: Result<JsonBody<AddressRequest>, ApiError>,
) -> Result<Json<StatusResponse>, ApiError> {
    fetch_status(&state, payload)
        .await
        .map_err(|e| {
            e.with_fallback(json!({
                "status": SystemStatus::empty(),
                "models": [],
            }))
        })
        .map(Json)
}

async fn fetch_status(
    state: &AppState,
    payload: Result<JsonBody<AddressRequest>, ApiError>,
) -> Result<StatusResponse, ApiError> {
    let JsonBody(request) = payload?;
    let address = state.address(request.requested())?;
    let resolved = state
        .resolver
        .call(&address, Operation::GetAvailableModels, &json!({}))
        .await?;
    let list: ModelList = decode(Operation::GetAvailableModels, resolved.body)?;

    let (active, completed) = state.tracker.counts();
    let status = system_status(&list.models).with_task_counts(active, completed);

    tracing::debug!(
        clients = status.total_clients,
        active = status.active_clients,
        models = list.models.len(),
        "Status reconciled"
    );

    Ok(StatusResponse {
        success: true,
        status,
        models: list.models,
        degraded: resolved.degraded,
    })
}
