//! Bridge-script strategy
//!
//! Runs `<interpreter> <script> <action> <json-params>` and reads one JSON
//! document from stdout. The child is killed if the deadline passes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use farmgate_core::{GatewayError, GatewayResult};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::TransportStrategy;
use crate::classify::classify_stderr;
use crate::discovery::{find_artifact, find_interpreter};
use crate::operation::Operation;

pub struct BridgeStrategy {
    root: PathBuf,
    interpreter: Option<PathBuf>,
    script: Option<PathBuf>,
    unavailable_reason: Option<String>,
}

impl BridgeStrategy {
    /// Locate the bridge script and an interpreter to run it
    pub fn new(root: &Path, scripts: &[PathBuf], interpreters: &[PathBuf]) -> Self {
        let script = find_artifact(root, scripts, "bridge script");
        let interpreter = find_interpreter(root, interpreters);

        let unavailable_reason = match (&script, &interpreter) {
            (Err(e), _) => Some(e.to_string()),
            (Ok(_), None) => Some("no interpreter found for bridge script".to_string()),
            (Ok(_), Some(_)) => None,
        };

        if let (Ok(script), Some(interpreter)) = (&script, &interpreter) {
            debug!(
                script = %script.display(),
                interpreter = %interpreter.display(),
                "Bridge available"
            );
        }

        Self {
            root: root.to_path_buf(),
            interpreter,
            script: script.ok(),
            unavailable_reason,
        }
    }

    /// Parse stdout as JSON, falling back to the last line that looks like an
    /// object when the script also printed diagnostics
    fn parse_stdout(op: Operation, stdout: &str) -> GatewayResult<Value> {
        if let Ok(value) = serde_json::from_str::<Value>(stdout.trim()) {
            return Ok(value);
        }
        stdout
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| line.starts_with('{'))
            .find_map(|line| serde_json::from_str::<Value>(line).ok())
            .ok_or_else(|| {
                GatewayError::ProtocolError(format!("{}: bridge printed no JSON result", op))
            })
    }
}

#[async_trait]
impl TransportStrategy for BridgeStrategy {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn probe(&self, _op: Operation) -> GatewayResult<()> {
        match &self.unavailable_reason {
            Some(reason) => Err(GatewayError::ConfigurationError(reason.clone())),
            None => Ok(()),
        }
    }

    #[instrument(skip(self, params), fields(strategy = "bridge"))]
    async fn call(
        &self,
        address: &str,
        op: Operation,
        params: &Value,
        deadline: Duration,
    ) -> GatewayResult<Value> {
        self.probe(op)?;
        let (Some(interpreter), Some(script)) = (&self.interpreter, &self.script) else {
            return Err(GatewayError::ConfigurationError(
                "bridge not configured".into(),
            ));
        };

        let mut params = params.clone();
        if let Value::Object(map) = &mut params {
            map.insert(
                "server_address".to_string(),
                Value::String(address.to_string()),
            );
        }
        let payload = serde_json::to_string(&params)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let child = Command::new(interpreter)
            .arg(script)
            .arg(op.bridge_action())
            .arg(&payload)
            .current_dir(&self.root)
            .env("PYTHONPATH", &self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GatewayError::ConfigurationError(format!(
                    "cannot start {}: {}",
                    interpreter.display(),
                    e
                ))
            })?;

        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(GatewayError::Internal(format!(
                    "{}: bridge I/O failed: {}",
                    op, e
                )))
            }
            Err(_) => {
                warn!(operation = %op, "Bridge deadline exceeded, child killed");
                return Err(GatewayError::timeout(op.method(), deadline));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            debug!(status = ?output.status.code(), stderr = %stderr.trim(), "Bridge failed");
            return Err(classify_stderr(&stderr, op, deadline));
        }

        Self::parse_stdout(op, &String::from_utf8_lossy(&output.stdout))
    }
}
