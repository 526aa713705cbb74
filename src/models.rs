use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::ApiError;

/// A stored user record, keyed by `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Record {
    pub id: String,
    pub name: String,
}

/// Request body for POST /user before validation
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecordInput {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl RecordInput {
    /// Check required fields and turn the input into a storable record.
    pub fn into_record(self) -> Result<Record, ApiError> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ApiError::MissingField("id")),
        };
        let name = self.name.ok_or(ApiError::MissingField("name"))?;
        Ok(Record { id, name })
    }
}

/// Body of an operation descriptor.
///
/// API Gateway delivers the body as a JSON-encoded string; direct invocations
/// may inline the JSON value instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(JsonValue),
}

impl RequestBody {
    pub fn into_payload(self) -> String {
        match self {
            RequestBody::Text(text) => text,
            RequestBody::Json(value) => value.to_string(),
        }
    }
}

/// One logical request: route pattern, method and optional body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub resource: String,
    #[serde(alias = "httpMethod")]
    pub method: String,
    #[serde(default)]
    pub body: Option<RequestBody>,
    #[serde(default, rename = "pathParameters")]
    pub path_parameters: Option<HashMap<String, String>>,
}

#[cfg(test)]
impl OperationDescriptor {
    pub fn new(resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            method: method.into(),
            body: None,
            path_parameters: None,
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Result of dispatching one operation descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

/// Fan-out input: descriptors to run concurrently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutRequest {
    pub requests: Vec<OperationDescriptor>,
}

/// Fan-out output; `results[i]` answers `requests[i]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutResponse {
    pub results: Vec<DispatchResponse>,
}

/// Payload accepted by the Lambda function
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Invocation {
    FanOut(FanOutRequest),
    Single(OperationDescriptor),
}

/// Payload returned by the Lambda function
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum InvocationOutput {
    FanOut(FanOutResponse),
    Single(DispatchResponse),
}
