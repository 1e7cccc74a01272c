//! Sensor submission and analysis handler

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use farmgate_core::analysis::{summary, FAILURE_RECOMMENDATIONS};
use farmgate_core::{AnalysisResult, GatewayError, SensorReading};
use farmgate_transport::wire::{decode, SensorDataRequest, SensorDataResponse};
use farmgate_transport::Operation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::AddressRequest;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

const DEFAULT_MESSAGE: &str = "Sensor data analyzed successfully";
const DEFAULT_MODEL: &str = "agricultural-classifier";
const DEFAULT_CLIENT: &str = "sensor-processor";

#[derive(Debug, Deserialize)]
pub struct SensorDataSubmission {
    #[serde(flatten)]
    pub target: AddressRequest,
    /// Untyped reading; values are coerced to numbers
    #[serde(default)]
    pub sensor_data: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct SensorAnalysis {
    pub summary: String,
    pub detailed_analysis: AnalysisResult,
    /// Seconds
    pub processing_time: f64,
    pub model_used: String,
    pub client_id: String,
}

#[derive(Debug, Serialize)]
pub struct SensorDataResult {
    pub success: bool,
    pub message: String,
    pub analysis: SensorAnalysis,
    pub recommendations: Vec<String>,
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// POST /api/grpc/sensor-data
///
/// The reading is forwarded to the control plane and scored locally. On
/// failure the body carries a zero-score analysis with fixed remediation
/// steps.
pub async fn submit_sensor_data(
    State(state): State<AppState>,
    payload: Result<JsonBody<SensorDataSubmission>, ApiError>,
) -> Result<Json<SensorDataResult>, ApiError> {
    process(&state, payload).await.map(Json).map_err(|e| {
        let fallback = json!({
            "analysis": {
                "summary": "Failed to process sensor data",
                "detailed_analysis": AnalysisResult::failed(e.error()),
                "processing_time": 0.0,
                "model_used": "",
                "client_id": "",
            },
            "recommendations": FAILURE_RECOMMENDATIONS,
        });
        e.with_fallback(fallback)
    })
}

async fn process(
    state: &AppState,
    payload: Result<JsonBody<SensorDataSubmission>, ApiError>,
) -> Result<SensorDataResult, ApiError> {
    let JsonBody(submission) = payload?;
    let address = state.address(submission.target.requested())?;
    let sensor_data = submission
        .sensor_data
        .ok_or_else(|| ApiError::bad_request("sensor_data is required"))?;
    let reading = SensorReading::from(sensor_data);

    Ok(analyze(state, &address, &reading).await?)
}

async fn analyze(
    state: &AppState,
    address: &str,
    reading: &SensorReading,
) -> Result<SensorDataResult, GatewayError> {
    let started = Instant::now();
    let request = serde_json::to_value(SensorDataRequest::from_reading(reading))
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    let resolved = state
        .resolver
        .call(address, Operation::ProcessSensorData, &request)
        .await?;
    let remote: SensorDataResponse = decode(Operation::ProcessSensorData, resolved.body)?;

    let detailed_analysis = state.engine.analyze(reading);
    let recommendations = state.engine.recommendations(reading);
    let processing_time = if remote.processing_time > 0.0 {
        remote.processing_time
    } else {
        started.elapsed().as_secs_f64()
    };

    tracing::info!(
        health_score = detailed_analysis.health_score,
        alerts = detailed_analysis.alerts.len(),
        "Sensor reading analysed"
    );

    Ok(SensorDataResult {
        success: true,
        message: or_default(remote.message, DEFAULT_MESSAGE),
        analysis: SensorAnalysis {
            summary: summary(&detailed_analysis),
            detailed_analysis,
            processing_time,
            model_used: or_default(remote.model_used, DEFAULT_MODEL),
            client_id: or_default(remote.client_id, DEFAULT_CLIENT),
        },
        recommendations,
    })
}
