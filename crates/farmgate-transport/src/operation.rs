//! Control-plane operations and their deadlines

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Operations the control plane offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    HealthCheck,
    GetAvailableModels,
    ProcessSensorData,
    DeployModel,
    #[serde(rename = "ProcessAIRequest")]
    ProcessAiRequest,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::HealthCheck,
        Operation::GetAvailableModels,
        Operation::ProcessSensorData,
        Operation::DeployModel,
        Operation::ProcessAiRequest,
    ];

    /// RPC method name as declared in the interface definition
    pub fn method(self) -> &'static str {
        match self {
            Operation::HealthCheck => "HealthCheck",
            Operation::GetAvailableModels => "GetAvailableModels",
            Operation::ProcessSensorData => "ProcessSensorData",
            Operation::DeployModel => "DeployModel",
            Operation::ProcessAiRequest => "ProcessAIRequest",
        }
    }

    /// Action name passed to the bridge script
    pub fn bridge_action(self) -> &'static str {
        match self {
            Operation::HealthCheck => "health",
            Operation::GetAvailableModels => "get_models",
            Operation::ProcessSensorData => "process_sensor_data",
            Operation::DeployModel => "deploy_model",
            Operation::ProcessAiRequest => "ai_request",
        }
    }

    /// Whether the operation only reads control-plane state
    pub fn is_read_only(self) -> bool {
        matches!(self, Operation::HealthCheck | Operation::GetAvailableModels)
    }

    pub fn deadline_class(self) -> DeadlineClass {
        match self {
            Operation::HealthCheck | Operation::GetAvailableModels => DeadlineClass::Health,
            Operation::ProcessSensorData => DeadlineClass::Sensor,
            Operation::DeployModel => DeadlineClass::Model,
            Operation::ProcessAiRequest => DeadlineClass::Inference,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method())
    }
}

/// Deadline classes for outbound calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineClass {
    /// Bare reachability probe
    Liveness,
    /// Health and status reads
    Health,
    /// Sensor submissions
    Sensor,
    /// Model deployment
    Model,
    /// Generative inference
    Inference,
}

/// Deadline per class, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlines {
    #[serde(default = "default_liveness_ms")]
    pub liveness_ms: u64,
    #[serde(default = "default_health_ms")]
    pub health_ms: u64,
    #[serde(default = "default_sensor_ms")]
    pub sensor_ms: u64,
    #[serde(default = "default_model_ms")]
    pub model_ms: u64,
    #[serde(default = "default_inference_ms")]
    pub inference_ms: u64,
}

fn default_liveness_ms() -> u64 {
    2_000
}

fn default_health_ms() -> u64 {
    15_000
}

fn default_sensor_ms() -> u64 {
    30_000
}

fn default_model_ms() -> u64 {
    30_000
}

fn default_inference_ms() -> u64 {
    120_000
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            liveness_ms: default_liveness_ms(),
            health_ms: default_health_ms(),
            sensor_ms: default_sensor_ms(),
            model_ms: default_model_ms(),
            inference_ms: default_inference_ms(),
        }
    }
}

impl Deadlines {
    /// Same deadline for every class
    pub fn uniform(deadline: Duration) -> Self {
        let ms = deadline.as_millis() as u64;
        Self {
            liveness_ms: ms,
            health_ms: ms,
            sensor_ms: ms,
            model_ms: ms,
            inference_ms: ms,
        }
    }

    pub fn for_class(&self, class: DeadlineClass) -> Duration {
        let ms = match class {
            DeadlineClass::Liveness => self.liveness_ms,
            DeadlineClass::Health => self.health_ms,
            DeadlineClass::Sensor => self.sensor_ms,
            DeadlineClass::Model => self.model_ms,
            DeadlineClass::Inference => self.inference_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn for_operation(&self, op: Operation) -> Duration {
        self.for_class(op.deadline_class())
    }
}
