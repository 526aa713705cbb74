use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use tower::ServiceExt;

use crate::error::ApiError;
use crate::models::{DispatchResponse, OperationDescriptor};

/// Run one operation descriptor through the router.
///
/// The descriptor's resource pattern is expanded with its path parameters into
/// a concrete URI; the router then does the routing, so the dispatcher and
/// the local HTTP server share every handler. Store failures come back as a
/// 500 response and are never retried here.
pub async fn dispatch(router: Router, descriptor: OperationDescriptor) -> DispatchResponse {
    tracing::info!(
        "Dispatching {} {}",
        descriptor.method,
        descriptor.resource
    );

    let request = match build_request(descriptor) {
        Ok(request) => request,
        Err(err) => return err.into_dispatch_response(),
    };

    let response = router
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let status_code = response.status().as_u16();

    let body = match axum::body::to_bytes(response.into_body(), usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            tracing::error!("Failed to read response body: {}", err);
            return ApiError::Internal(format!("failed to read response body: {}", err))
                .into_dispatch_response();
        }
    };

    tracing::info!("Dispatch finished with status {}", status_code);
    DispatchResponse { status_code, body }
}

fn build_request(descriptor: OperationDescriptor) -> Result<Request<Body>, ApiError> {
    let method_name = descriptor.method.trim().to_ascii_uppercase();
    let not_found = || ApiError::RouteNotFound {
        method: method_name.clone(),
        resource: descriptor.resource.clone(),
    };

    // axum answers HEAD through GET routes; descriptors only carry GET or POST.
    let method = match method_name.as_str() {
        "GET" => Method::GET,
        "POST" => Method::POST,
        _ => return Err(not_found()),
    };
    if descriptor.resource.contains(['?', '#']) {
        return Err(not_found());
    }
    let path = resolve_path(&descriptor)?;

    let body = descriptor
        .body
        .map(|body| Body::from(body.into_payload()))
        .unwrap_or_else(Body::empty);

    Request::builder()
        .method(method)
        .uri(path.as_str())
        .header("content-type", "application/json")
        .body(body)
        .map_err(|_| not_found())
}

/// Expand `{name}` segments of the resource pattern from the path parameters.
fn resolve_path(descriptor: &OperationDescriptor) -> Result<String, ApiError> {
    let segments = descriptor
        .resource
        .split('/')
        .map(|segment| {
            let Some(name) = segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            else {
                return Ok(segment.to_string());
            };
            descriptor
                .path_parameters
                .as_ref()
                .and_then(|params| params.get(name))
                .map(|value| urlencoding::encode(value).into_owned())
                .ok_or_else(|| ApiError::MissingPathParameter(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(segments.join("/"))
}
