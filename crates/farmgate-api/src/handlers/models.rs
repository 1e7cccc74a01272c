//! Model deployment and direct inference handlers

use axum::extract::State;
use axum::Json;
use farmgate_core::ids::generate_id;
use farmgate_core::GatewayError;
use farmgate_transport::wire::{decode, AiRequest, AiResponse, DeployModelRequest, DeployModelResponse};
use farmgate_transport::Operation;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::AddressRequest;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

/// Prefix of generated request identifiers
pub const REQUEST_ID_PREFIX: &str = "req";

fn required(field: &'static str, value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} is required", field)))
}

fn to_params<T: serde::Serialize>(body: &T) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| GatewayError::Internal(e.to_string()).into())
}

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    #[serde(flatten)]
    pub target: AddressRequest,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
}

/// POST /api/grpc/deploy-model
pub async fn deploy_model(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<DeployRequest>,
) -> Result<Json<DeployModelResponse>, ApiError> {
    let address = state.address(request.target.requested())?;
    let model_name = required("model_name", request.model_name)?;
    let params = to_params(&DeployModelRequest::new(model_name, request.model_type))?;

    let resolved = state
        .resolver
        .call(&address, Operation::DeployModel, &params)
        .await?;
    let mut response: DeployModelResponse = decode(Operation::DeployModel, resolved.body)?;
    response.success = true;

    tracing::info!(
        container_id = %response.container_id,
        endpoint = %response.endpoint_url,
        "Model deployed"
    );
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct InferenceRequest {
    #[serde(flatten)]
    pub target: AddressRequest,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// POST /api/grpc/ai-request
pub async fn ai_request(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<InferenceRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    let address = state.address(request.target.requested())?;
    let ai_request = AiRequest {
        request_id: generate_id(REQUEST_ID_PREFIX),
        model_name: required("model_name", request.model_name)?,
        prompt: required("prompt", request.prompt)?,
        parameters: request.parameters,
    };

    let mut response = run_inference(&state, &address, &ai_request).await?;
    if response.request_id.is_empty() {
        response.request_id = ai_request.request_id;
    }
    Ok(Json(response))
}

/// Issue `ProcessAIRequest` and decode the answer
pub(crate) async fn run_inference(
    state: &AppState,
    address: &str,
    request: &AiRequest,
) -> Result<AiResponse, GatewayError> {
    let params = serde_json::to_value(request).map_err(|e| GatewayError::Internal(e.to_string()))?;
    let resolved = state
        .resolver
        .call(address, Operation::ProcessAiRequest, &params)
        .await?;

    let mut response: AiResponse = decode(Operation::ProcessAiRequest, resolved.body)?;
    response.success = true;
    tracing::debug!(
        request_id = %request.request_id,
        model = %response.model_used,
        client_id = %response.client_id,
        "Inference answered"
    );
    Ok(response)
}
