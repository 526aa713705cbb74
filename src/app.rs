use anyhow::{Context, Result};
use axum::{
    http::{Method, Uri},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::config::Config;
use crate::error::ApiError;
use crate::handlers::{get_handler, health_handler, list_handler, put_handler};
use crate::routes;
use crate::state::AppState;

/// Router with the user routes only.
///
/// This is what operation descriptors are dispatched through, so anything it
/// does not route (including a known path with the wrong method) answers 404.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .route(routes::USERS, get(list_handler))
        .route(routes::USER, post(put_handler))
        .route(routes::USER_ITEM, get(get_handler))
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .with_state(state)
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    tracing::info!("No route for {} {}", method, uri.path());
    ApiError::RouteNotFound {
        method: method.to_string(),
        resource: uri.path().to_string(),
    }
}

/// Serve the user routes over HTTP for local development.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let app = build_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    let address = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Listening on {} (docs at /swagger-ui)", address);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated")
}


#[cfg(test)]
mod tests {
    use super::test_support::{send, test_app};
    use crate::error::ErrorResponse;
    use crate::store::InMemoryRecordStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = test_app(Arc::new(InMemoryRecordStore::new()));

        let (status, body) = send(&app, "GET", "/accounts", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(error.error, "No route for GET /accounts");
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_found() {
        let app = test_app(Arc::new(InMemoryRecordStore::new()));

        let (status, _) = send(&app, "POST", "/users", Some("{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/user", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/user/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_docs_are_not_part_of_dispatch_router() {
        let app = test_app(Arc::new(InMemoryRecordStore::new()));

        let (status, _) = send(&app, "GET", "/swagger-ui", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
