//! API error type and conversion into tagged failure bodies

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use farmgate_core::GatewayError;
use serde_json::{Map, Value};

/// Failed gateway operation, rendered as
/// `{success: false, error, kind, hint, ...fallback}`
#[derive(Debug)]
pub struct ApiError {
    error: GatewayError,
    /// Extra fields the UI renders in place of the missing result
    fallback: Map<String, Value>,
}

impl ApiError {
    /// Attach fallback fields (an object; anything else is ignored)
    pub fn with_fallback(mut self, fields: Value) -> Self {
        if let Value::Object(map) = fields {
            self.fallback.extend(map);
        }
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(message.into()).into()
    }

    pub fn error(&self) -> &GatewayError {
        &self.error
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self {
            error,
            fallback: Map::new(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = self.error.kind();
        let message = self.error.to_string();

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error = kind, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = kind, %message, "API client error");
        }

        let mut body = self.fallback;
        body.insert("success".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(message));
        body.insert("kind".into(), Value::String(kind.into()));
        body.insert("hint".into(), Value::String(self.error.hint().into()));

        (status, Json(Value::Object(body))).into_response()
    }
}
