use crate::error::{ApiError, ErrorResponse};
use crate::models::{Record, RecordInput};
use crate::routes;
use crate::state::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};

/// POST /user handler - Insert or overwrite a record
///
/// The body is parsed by hand rather than through the `Json` extractor so
/// that malformed JSON and missing fields both answer 400.
#[utoipa::path(
    post,
    path = routes::USER,
    request_body = RecordInput,
    responses(
        (status = 200, description = "Record stored", body = Record),
        (status = 400, description = "Missing body, malformed JSON or missing field", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn put_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingBody);
    }

    let input: RecordInput = serde_json::from_slice(&body)?;
    let record = input.into_record()?;

    state.store.put(&record).await?;

    tracing::info!("Successfully stored record with id: {}", record.id);
    Ok((StatusCode::OK, Json(record)))
}
