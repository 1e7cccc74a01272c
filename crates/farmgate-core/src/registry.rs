//! Node directory reconciliation.
//!
//! The control plane only reports a flat list of deployed models. These
//! helpers rebuild the per-node view the dashboard shows: one [`NodeInfo`]
//! per distinct non-empty `client_id`, in first-occurrence order, with
//! first-seen fields winning.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{ModelRecord, ModelStatus, NodeInfo, NodeStatus, SystemStatus};

/// Literal reported when no address can be extracted from an endpoint
pub const UNKNOWN_ADDRESS: &str = "Unknown";

static IPV4_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").ok());

/// Rebuild the node directory from the flat model list.
///
/// ```
/// # use farmgate_core::registry::reconcile;
/// assert!(reconcile(&[]).is_empty());
/// ```
pub fn reconcile(models: &[ModelRecord]) -> Vec<NodeInfo> {
    let mut nodes: Vec<NodeInfo> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in models {
        if record.client_id.is_empty() {
            continue;
        }

        match index.get(record.client_id.as_str()) {
            Some(&pos) => nodes[pos].deployed_models.push(record.model_name.clone()),
            None => {
                index.insert(record.client_id.as_str(), nodes.len());
                nodes.push(NodeInfo {
                    client_id: record.client_id.clone(),
                    hostname: hostname_from_client_id(&record.client_id).to_string(),
                    ip_address: extract_ip(&record.endpoint_url),
                    deployed_models: vec![record.model_name.clone()],
                    status: if record.status == ModelStatus::Running {
                        NodeStatus::Online
                    } else {
                        NodeStatus::Offline
                    },
                    performance_score: record.performance_score,
                });
            }
        }
    }

    nodes
}

/// Build the aggregate status for a model list.
///
/// Task counters are left at zero; the caller owns them.
pub fn system_status(models: &[ModelRecord]) -> SystemStatus {
    let clients = reconcile(models);

    let mut seen = HashSet::new();
    let available_models = models
        .iter()
        .filter(|m| seen.insert(m.model_name.as_str()))
        .map(|m| m.model_name.clone())
        .collect();

    SystemStatus {
        total_clients: clients.len(),
        active_clients: clients.iter().filter(|c| c.is_online()).count(),
        total_models_deployed: models.iter().filter(|m| m.is_deployed()).count(),
        available_models,
        clients,
        ..SystemStatus::empty()
    }
}

/// Find the node that should receive work for a model.
///
/// Prefers an online node hosting the model, then any node hosting it.
pub fn find_node_for_model<'a>(nodes: &'a [NodeInfo], model_name: &str) -> Option<&'a NodeInfo> {
    nodes
        .iter()
        .find(|n| n.is_online() && n.hosts(model_name))
        .or_else(|| nodes.iter().find(|n| n.hosts(model_name)))
}

/// Strip a `client-<digits>-` prefix from a client ID.
///
/// ```
/// # use farmgate_core::registry::hostname_from_client_id;
/// assert_eq!(hostname_from_client_id("client-3-raspberrypi"), "raspberrypi");
/// assert_eq!(hostname_from_client_id("jetson-nano"), "jetson-nano");
/// ```
pub fn hostname_from_client_id(client_id: &str) -> &str {
    let Some(rest) = client_id.strip_prefix("client-") else {
        return client_id;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return client_id;
    }
    match rest[digits..].strip_prefix('-') {
        Some(hostname) => hostname,
        None => client_id,
    }
}

/// Extract the host part of a model endpoint URL.
///
/// Falls back to the first IPv4-shaped substring when the endpoint is not a
/// URL with a host, and to [`UNKNOWN_ADDRESS`] when neither works.
pub fn extract_ip(endpoint_url: &str) -> String {
    if endpoint_url.is_empty() {
        return UNKNOWN_ADDRESS.to_string();
    }

    if let Ok(url) = Url::parse(endpoint_url) {
        if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
            return host.to_string();
        }
    }

    IPV4_PATTERN
        .as_ref()
        .and_then(|re| re.captures(endpoint_url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

/// Per-model details reported alongside assignments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Parameter-count class derived from the model name
    pub size: String,
    pub status: ModelStatus,
    pub endpoint: String,
}

/// Which node runs which model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelAssignments {
    /// client_id to model name (last record for a client wins)
    pub assignments: BTreeMap<String, String>,
    /// model name to details
    pub model_info: BTreeMap<String, ModelInfo>,
}

/// Summarise which deployed model each node is serving
pub fn model_assignments(models: &[ModelRecord]) -> ModelAssignments {
    let mut result = ModelAssignments::default();

    for record in models.iter().filter(|m| !m.client_id.is_empty()) {
        result
            .assignments
            .insert(record.client_id.clone(), record.model_name.clone());
        result.model_info.insert(
            record.model_name.clone(),
            ModelInfo {
                size: size_class(&record.model_name).to_string(),
                status: record.status,
                endpoint: record.endpoint_url.clone(),
            },
        );
    }

    result
}

fn size_class(model_name: &str) -> &'static str {
    let lower = model_name.to_ascii_lowercase();
    if lower.contains("8b") {
        "8B"
    } else if lower.contains("3b") {
        "3B"
    } else {
        "1B"
    }
}
