use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::DispatchResponse;

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// This error type provides consistent error handling across all endpoints,
/// automatically mapping different error types to appropriate HTTP status codes
/// and formatting them as JSON responses. The dispatcher reuses the same mapping
/// for failures detected before a request reaches the router.
#[derive(Debug)]
pub enum ApiError {
    /// POST without a body
    MissingBody,
    /// Required record field absent or empty
    MissingField(&'static str),
    /// JSON parsing error
    JsonError(serde_json::Error),
    /// Invocation payload does not describe an operation
    InvalidInvocation(String),
    /// Route placeholder without a matching path parameter
    MissingPathParameter(String),
    /// Record not found in the table
    RecordNotFound(String),
    /// No route for this resource and method
    RouteNotFound { method: String, resource: String },
    /// Database operation error
    DatabaseError(anyhow::Error),
    /// Failure inside the dispatcher itself
    Internal(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::MissingBody => (
                StatusCode::BAD_REQUEST,
                "Request body is required".to_string(),
            ),
            ApiError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {}", field),
            ),
            ApiError::JsonError(err) => (
                StatusCode::BAD_REQUEST,
                format!("JSON parse error: {}", err),
            ),
            ApiError::InvalidInvocation(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Malformed invocation: {}", msg),
            ),
            ApiError::MissingPathParameter(name) => (
                StatusCode::BAD_REQUEST,
                format!("Missing path parameter: {}", name),
            ),
            ApiError::RecordNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Record not found: {}", id),
            ),
            ApiError::RouteNotFound { method, resource } => (
                StatusCode::NOT_FOUND,
                format!("No route for {} {}", method, resource),
            ),
            ApiError::DatabaseError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {:#}", err),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", msg),
            ),
        }
    }

    /// Render the error the way the router would, without going through it.
    pub fn into_dispatch_response(self) -> DispatchResponse {
        let (status, error) = self.status_and_message();
        let body = serde_json::to_string(&ErrorResponse { error })
            .unwrap_or_else(|_| r#"{"error":"unserializable error"}"#.to_string());
        DispatchResponse {
            status_code: status.as_u16(),
            body,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!("{}", error_message);
        }

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err)
    }
}
