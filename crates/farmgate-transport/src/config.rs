//! Resolver configuration
//!
//! Candidate paths are tried in order; relative entries are resolved
//! against `workspace_root`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for building a [`crate::ConnectionResolver`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Control-plane address used when a request does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_address: Option<String>,
    /// Base directory for relative candidate paths
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    /// Where to look for the interface definition, highest priority first
    #[serde(default = "default_definition_candidates")]
    pub definition_candidates: Vec<PathBuf>,
    /// Where to look for the bridge script, highest priority first
    #[serde(default = "default_bridge_script_candidates")]
    pub bridge_script_candidates: Vec<PathBuf>,
    /// Interpreters for the bridge script: virtual-env paths first, then
    /// bare commands resolved through `PATH`
    #[serde(default = "default_interpreter_candidates")]
    pub interpreter_candidates: Vec<PathBuf>,
    /// Answer read-only operations with canned data when nothing else is available
    #[serde(default = "default_allow_degraded")]
    pub allow_degraded: bool,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_definition_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("load_balancer.proto"),
        PathBuf::from("../LB/load_balancer.proto"),
        PathBuf::from("../load_balancer.proto"),
    ]
}

fn default_bridge_script_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("../scripts/grpc_bridge.py"),
        PathBuf::from("scripts/grpc_bridge.py"),
    ]
}

fn default_interpreter_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("../venv/bin/python"),
        PathBuf::from("../venv/Scripts/python.exe"),
        PathBuf::from("python3"),
        PathBuf::from("python"),
    ]
}

fn default_allow_degraded() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_address: None,
            workspace_root: default_workspace_root(),
            definition_candidates: default_definition_candidates(),
            bridge_script_candidates: default_bridge_script_candidates(),
            interpreter_candidates: default_interpreter_candidates(),
            allow_degraded: default_allow_degraded(),
        }
    }
}

impl ResolverConfig {
    /// Default candidates, rooted at `workspace_root`
    pub fn rooted_at(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Self::default()
        }
    }
}
