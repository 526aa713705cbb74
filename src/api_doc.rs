use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{Record, RecordInput};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "user-dispatcher API",
        version = "0.1.0",
        description = "User records stored in DynamoDB, served by a Lambda request dispatcher"
    ),
    paths(
        handlers::health::health_handler,
        handlers::list::list_handler,
        handlers::put::put_handler,
        handlers::get::get_handler
    ),
    components(
        schemas(
            Record,
            RecordInput,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "users", description = "User record operations")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_user_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in ["/health", "/users", "/user", "/user/{user_id}"] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {} in {:?}",
                expected,
                paths
            );
        }
    }
}
