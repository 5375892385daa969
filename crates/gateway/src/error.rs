//! Error types for the gateway layer

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_messenger::MessengerError;
use serde_json::json;
use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::InternalError(_) | GatewayError::WebSocketError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable code, shared by REST bodies and WebSocket error frames.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Conflict(_) => "conflict",
            GatewayError::InternalError(_) => "internal",
            GatewayError::WebSocketError(_) => "stream",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let error_response = json!({
            "error": self.code(),
            "message": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<MessengerError> for GatewayError {
    fn from(error: MessengerError) -> Self {
        match error {
            MessengerError::NotFound { .. } => GatewayError::NotFound(error.to_string()),
            MessengerError::AlreadyExists { .. } => GatewayError::Conflict(error.to_string()),
            MessengerError::InvalidInput { message } => GatewayError::InvalidRequest(message),
            MessengerError::StreamTerminated { .. } => {
                GatewayError::WebSocketError(error.to_string())
            }
            MessengerError::TransientCollision { .. } | MessengerError::Fatal { .. } => {
                GatewayError::InternalError(error.to_string())
            }
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for GatewayError {
    fn from(rejection: PathRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messenger_errors_map_to_status_codes() {
        let cases = [
            (MessengerError::not_found("conversation", "x"), StatusCode::NOT_FOUND),
            (MessengerError::already_exists("users.email"), StatusCode::CONFLICT),
            (MessengerError::invalid_input("empty"), StatusCode::BAD_REQUEST),
            (MessengerError::fatal("disk"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                MessengerError::TransientCollision { attempt: 1 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(GatewayError::from(error).status_code(), status);
        }
    }
}
