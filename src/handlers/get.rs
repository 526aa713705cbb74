use crate::error::{ApiError, ErrorResponse};
use crate::models::Record;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// GET /user/{user_id} handler - Retrieve one record
#[utoipa::path(
    get,
    path = routes::USER_ITEM,
    params(
        ("user_id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record found", body = Record),
        (status = 404, description = "Record not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    match state.store.get(&user_id).await? {
        Some(record) => {
            tracing::info!("Successfully retrieved record with id: {}", user_id);
            Ok((StatusCode::OK, Json(record)))
        }
        None => {
            tracing::info!("Record not found with id: {}", user_id);
            Err(ApiError::RecordNotFound(user_id))
        }
    }
}
