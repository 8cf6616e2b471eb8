//! OpenAPI specification

use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{health, pipeline};
use crate::domain::news::StatusSnapshot;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sentinews API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Market news sentiment pipeline"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "pipeline", description = "News pipeline triggers and status")
    ),
    paths(
        health::health,
        pipeline::trigger_collect,
        pipeline::trigger_analyze,
        pipeline::trigger_archive,
        pipeline::get_status,
    ),
    components(schemas(
        health::HealthResponse,
        pipeline::CollectResponse,
        StatusSnapshot,
    ))
)]
struct ApiDoc;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_all_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in ["/health", "/collect", "/analyze", "/archive", "/status"] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {expected}"
            );
        }
    }
}
