use anyhow::Result;
use axum::Router;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value as JsonValue;

use crate::dispatcher::dispatch;
use crate::error::ApiError;
use crate::fanout::fan_out;
use crate::models::{Invocation, InvocationOutput};

/// Serve Lambda invocations until the runtime shuts down.
pub async fn run(router: Router, fanout_max_concurrency: usize) -> Result<()> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<JsonValue>| {
        let router = router.clone();
        async move { handle_event(router, fanout_max_concurrency, event).await }
    }))
    .await
    .map_err(|err| anyhow::anyhow!("Lambda runtime failed: {}", err))
}

#[tracing::instrument(skip_all, fields(req_id = %event.context.request_id))]
async fn handle_event(
    router: Router,
    fanout_max_concurrency: usize,
    event: LambdaEvent<JsonValue>,
) -> Result<InvocationOutput, lambda_runtime::Error> {
    Ok(handle_payload(router, fanout_max_concurrency, event.payload).await)
}

/// Route a raw invocation payload to the dispatcher or the fan-out.
///
/// Payloads that match neither shape answer 400 instead of failing the
/// invocation, so callers always get a `statusCode`.
pub async fn handle_payload(
    router: Router,
    fanout_max_concurrency: usize,
    payload: JsonValue,
) -> InvocationOutput {
    tracing::debug!("Received event: {}", payload);

    match serde_json::from_value::<Invocation>(payload) {
        Ok(Invocation::FanOut(request)) => {
            InvocationOutput::FanOut(fan_out(router, request, fanout_max_concurrency).await)
        }
        Ok(Invocation::Single(descriptor)) => {
            InvocationOutput::Single(dispatch(router, descriptor).await)
        }
        Err(err) => {
            tracing::warn!("Rejected malformed invocation: {}", err);
            InvocationOutput::Single(
                ApiError::InvalidInvocation(
                    "expected an operation descriptor or a list of requests".to_string(),
                )
                .into_dispatch_response(),
            )
        }
    }
}
