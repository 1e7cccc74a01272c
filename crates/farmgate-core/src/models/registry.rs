//! Deployed-model records and the node directory derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment state of a model as reported by the control plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Serving requests
    Running,
    /// Deployed but stopped
    Stopped,
    /// Known to the control plane but not deployed anywhere
    #[default]
    NotDeployed,
    /// Any status string this gateway does not recognise
    #[serde(other)]
    Unknown,
}

/// One row of the control plane's flat model list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_name: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub status: ModelStatus,
    #[serde(default)]
    pub endpoint_url: String,
    /// Owning node, empty when the model is not deployed
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub performance_score: f64,
}

impl ModelRecord {
    /// Whether this record counts as deployed
    pub fn is_deployed(&self) -> bool {
        self.status != ModelStatus::NotDeployed
    }
}

/// Liveness of a compute node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
}

/// One compute node, reconstructed from the model records it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Unique key of the node
    pub client_id: String,
    /// `client_id` without its `client-<n>-` prefix
    pub hostname: String,
    /// Host parsed out of the first endpoint URL seen, or `"Unknown"`
    pub ip_address: String,
    /// Names of all models this node hosts, in input order
    pub deployed_models: Vec<String>,
    pub status: NodeStatus,
    pub performance_score: f64,
}

impl NodeInfo {
    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    /// Whether the node hosts a model with this name
    pub fn hosts(&self, model_name: &str) -> bool {
        self.deployed_models.iter().any(|m| m == model_name)
    }
}

/// Aggregate view of the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub timestamp: DateTime<Utc>,
    pub total_clients: usize,
    pub active_clients: usize,
    pub total_models_deployed: usize,
    /// Tasks this gateway has created that are still `submitted`
    pub active_tasks: usize,
    /// Tasks this gateway has seen reach `completed`
    pub completed_tasks: usize,
    /// Distinct model names, first-occurrence order
    pub available_models: Vec<String>,
    pub clients: Vec<NodeInfo>,
}

impl SystemStatus {
    /// Status with no nodes and no models
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            total_clients: 0,
            active_clients: 0,
            total_models_deployed: 0,
            active_tasks: 0,
            completed_tasks: 0,
            available_models: Vec::new(),
            clients: Vec::new(),
        }
    }

    /// Attach task counters from the tracker
    pub fn with_task_counts(mut self, active: usize, completed: usize) -> Self {
        self.active_tasks = active;
        self.completed_tasks = completed;
        self
    }
}
