use crate::error::{ApiError, ErrorResponse};
use crate::models::Record;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /users handler - List every record
///
/// Table scans come back in no particular order, so records are sorted by id
/// before they are returned.
#[utoipa::path(
    get,
    path = routes::USERS,
    responses(
        (status = 200, description = "All records, sorted by id", body = Vec<Record>),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<Record>>), ApiError> {
    let mut records = state.store.scan().await?;
    records.sort_by(|a, b| a.id.cmp(&b.id));

    tracing::info!("Listed {} records", records.len());
    Ok((StatusCode::OK, Json(records)))
}
