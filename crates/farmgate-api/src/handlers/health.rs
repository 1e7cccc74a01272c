//! Control-plane health and liveness handlers

use axum::extract::State;
use axum::Json;
use farmgate_transport::probe::tcp_probe;
use farmgate_transport::wire::HealthReport;
use farmgate_transport::{DeadlineClass, Operation};
use serde::Serialize;
use serde_json::json;

use super::AddressRequest;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub health: HealthReport,
    /// Transport that produced the answer
    pub transport: &'static str,
    pub degraded: bool,
}

/// POST /api/grpc/health
pub async fn health(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AddressRequest>,
) -> Result<Json<HealthResponse>, ApiError> {
    let address = state.address(request.requested())?;

    let resolved = state
        .resolver
        .call(&address, Operation::HealthCheck, &json!({}))
        .await?;

    Ok(Json(HealthResponse {
        success: true,
        health: HealthReport::from_body(&resolved.body),
        transport: resolved.strategy,
        degraded: resolved.degraded,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub reachable: bool,
    pub latency_ms: u64,
}

/// POST /api/simple-health
///
/// TCP connect only; says nothing about whether the control plane answers.
pub async fn simple_health(
    State(state): State<AppState>,
    payload: Result<JsonBody<AddressRequest>, ApiError>,
) -> Result<Json<ProbeResponse>, ApiError> {
    probe(&state, payload)
        .await
        .map(Json)
        .map_err(|e| e.with_fallback(json!({"reachable": false})))
}

async fn probe(
    state: &AppState,
    payload: Result<JsonBody<AddressRequest>, ApiError>,
) -> Result<ProbeResponse, ApiError> {
    let JsonBody(request) = payload?;
    let address = state.address(request.requested())?;
    let deadline = state.resolver.deadlines().for_class(DeadlineClass::Liveness);
    let latency = tcp_probe(&address, deadline).await?;

    Ok(ProbeResponse {
        success: true,
        reachable: true,
        latency_ms: latency.as_millis() as u64,
    })
}
