//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, live, visitors, visits};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Guerite API",
        version = "0.1.0",
        description = "Visitor registration kiosk, device-local API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Visitors
        visitors::list_visitors,
        visitors::detect_visitor,
        visitors::complete_draft,
        visitors::deregister_visitor,
        visitors::attach_photos,
        // Visits
        visits::list_visits,
        visits::record_visit,
        visits::visit_history,
        visits::check_out,
        // Listing views
        live::snapshot,
        live::live_updates,
    ),
    components(
        schemas(
            // Models
            crate::models::Visitor,
            crate::models::VisitorFields,
            crate::models::VisitorDraft,
            crate::models::Photo,
            crate::models::Visit,
            crate::models::Snapshot,
            crate::models::VisitorWithHistory,
            // Visitors
            visitors::PhotosRequest,
            visitors::DetectResponse,
            // Visits
            visits::RecordVisitRequest,
            visits::CheckOutRequest,
            visits::CheckOutResponse,
            crate::services::registration::RecordedVisit,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "visitors", description = "Visitor identities and duplicate detection"),
        (name = "visits", description = "Visit registration, history and check-out"),
        (name = "live", description = "Listing view snapshots")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
