//! Request and response shapes exchanged with the control plane

use chrono::{DateTime, TimeZone, Utc};
use farmgate_core::models::unit_for_parameter;
use farmgate_core::{GatewayError, GatewayResult, ModelRecord, SensorReading};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::operation::Operation;

pub const DEFAULT_SENSOR_ID: &str = "frontend_sensor";
pub const SENSOR_TYPE: &str = "multi_parameter";
pub const DEFAULT_LOCATION: &str = "Farm Location";
pub const DEFAULT_MODEL_TYPE: &str = "ollama";

/// Decode a control-plane payload, reporting shape mismatches as protocol errors
pub fn decode<T: DeserializeOwned>(op: Operation, body: Value) -> GatewayResult<T> {
    serde_json::from_value(body)
        .map_err(|e| GatewayError::ProtocolError(format!("{}: unexpected response shape: {}", op, e)))
}

/// One measurement in a `ProcessSensorData` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireReading {
    pub parameter: String,
    pub value: f64,
    pub unit: String,
}

/// `ProcessSensorData` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDataRequest {
    pub sensor_id: String,
    pub sensor_type: String,
    pub location: String,
    /// Unix seconds
    pub timestamp: i64,
    pub readings: Vec<WireReading>,
}

impl SensorDataRequest {
    pub fn from_reading(reading: &SensorReading) -> Self {
        Self {
            sensor_id: reading
                .sensor_id
                .clone()
                .unwrap_or_else(|| DEFAULT_SENSOR_ID.to_string()),
            sensor_type: SENSOR_TYPE.to_string(),
            location: reading
                .location
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            timestamp: reading.captured_at.timestamp(),
            readings: reading
                .values
                .iter()
                .map(|(parameter, value)| WireReading {
                    parameter: parameter.clone(),
                    value: *value,
                    unit: unit_for_parameter(parameter).to_string(),
                })
                .collect(),
        }
    }
}

/// `DeployModel` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployModelRequest {
    pub model_name: String,
    pub model_type: String,
}

impl DeployModelRequest {
    pub fn new(model_name: impl Into<String>, model_type: Option<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_type: model_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_TYPE.to_string()),
        }
    }
}

/// `ProcessAIRequest` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub request_id: String,
    pub model_name: String,
    pub prompt: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Health as reported by the control plane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Read a health payload, either bare or wrapped in a `health` key.
    ///
    /// A missing or unparsable timestamp is replaced by the current time.
    pub fn from_body(body: &Value) -> Self {
        let health = body.get("health").unwrap_or(body);
        Self {
            healthy: health
                .get("healthy")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            message: health
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            timestamp: health
                .get("timestamp")
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        }
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

/// `GetAvailableModels` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelRecord>,
}

/// `ProcessSensorData` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorDataResponse {
    pub message: String,
    /// Seconds
    pub processing_time: f64,
    pub model_used: String,
    pub client_id: String,
}

/// `DeployModel` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployModelResponse {
    pub success: bool,
    pub message: String,
    pub container_id: String,
    pub endpoint_url: String,
    pub assigned_port: u32,
}

/// `ProcessAIRequest` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiResponse {
    pub success: bool,
    pub request_id: String,
    pub response_text: String,
    /// Seconds
    pub processing_time: f64,
    pub model_used: String,
    pub client_id: String,
}
