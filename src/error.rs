// Error handling and response envelope shared by the HTTP surface
// Every endpoint answers with `{ success, data, error? }`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

/// Response envelope used by every endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Failure body
///
/// `errorKind` is the machine-readable discriminator, `error` the human-readable message.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    pub error: String,
    pub error_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: message.into(),
            error_kind: kind.to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Errors for the auxiliary read endpoints (inventory, promo eligibility)
#[derive(Debug)]
pub enum ApiError {
    /// Maps to HTTP 400 Bad Request
    BadRequest(String),

    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Maps to HTTP 500; details are logged, not returned
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                ErrorResponse::new("VALIDATION_ERROR", message)
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id))
            }
            ApiError::InternalError(message) => {
                error!("Internal error: {}", message);
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };
        body.into_response_with(status)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Logs a failure at a level matching its status class
pub fn log_failure(status: StatusCode, kind: &str, message: &str) {
    if status.is_server_error() {
        error!(error_kind = kind, "{}", message);
    } else if status == StatusCode::CONFLICT {
        warn!(error_kind = kind, "{}", message);
    } else {
        debug!(error_kind = kind, "{}", message);
    }
}
