//! Mapping of transport failures onto [`GatewayError`] kinds

use std::io;
use std::time::Duration;

use farmgate_core::{GatewayError, GatewayResult};
use reqwest::StatusCode;
use serde_json::Value;

use crate::operation::Operation;

/// Classify a reqwest failure. Timeouts are checked before connect errors
/// since a connect that runs past the deadline reports both.
pub fn classify_http(err: reqwest::Error, op: Operation, deadline: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(op.method(), deadline)
    } else if err.is_connect() {
        GatewayError::Unavailable(format!("{}: {}", op, err))
    } else if err.is_decode() {
        GatewayError::ProtocolError(format!("{}: undecodable response: {}", op, err))
    } else if err.is_builder() {
        GatewayError::InvalidRequest(format!("{}: {}", op, err))
    } else if let Some(status) = err.status() {
        classify_status(status, op, deadline, &err.to_string())
    } else {
        GatewayError::Unavailable(format!("{}: {}", op, err))
    }
}

/// Classify a non-success HTTP status from the control plane
pub fn classify_status(
    status: StatusCode,
    op: Operation,
    deadline: Duration,
    body: &str,
) -> GatewayError {
    match status {
        StatusCode::SERVICE_UNAVAILABLE => {
            GatewayError::Unavailable(format!("{}: control plane returned {}", op, status))
        }
        StatusCode::GATEWAY_TIMEOUT => GatewayError::timeout(op.method(), deadline),
        _ => GatewayError::ProtocolError(format!("{}: HTTP {}: {}", op, status, body.trim())),
    }
}

/// Classify a socket or process I/O failure
pub fn classify_io(err: &io::Error, what: &str) -> GatewayError {
    use io::ErrorKind::*;
    match err.kind() {
        ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected
        | AddrNotAvailable => GatewayError::Unavailable(format!("{}: {}", what, err)),
        TimedOut => GatewayError::Timeout {
            operation: what.to_string(),
            deadline_ms: 0,
        },
        InvalidInput => GatewayError::InvalidRequest(format!("{}: {}", what, err)),
        _ => GatewayError::Unavailable(format!("{}: {}", what, err)),
    }
}

/// Classify a bridge process that exited unsuccessfully from its stderr
pub fn classify_stderr(stderr: &str, op: Operation, deadline: Duration) -> GatewayError {
    let detail = stderr.trim();
    if detail.contains("DEADLINE_EXCEEDED") {
        GatewayError::timeout(op.method(), deadline)
    } else if detail.contains("UNAVAILABLE")
        || detail.contains("Connection refused")
        || detail.contains("failed to connect")
    {
        GatewayError::Unavailable(format!("{}: {}", op, last_line(detail)))
    } else {
        GatewayError::ProtocolError(format!("{}: bridge failed: {}", op, last_line(detail)))
    }
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or(text)
}

/// Reject payloads where the control plane reports `success: false`
pub fn check_payload(op: Operation, body: Value) -> GatewayResult<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let reason = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no reason given");
        return Err(GatewayError::ProtocolError(format!(
            "{} rejected by control plane: {}",
            op, reason
        )));
    }
    Ok(body)
}
