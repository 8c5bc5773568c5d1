//! API handlers for the kiosk UI

pub mod health;
pub mod live;
pub mod openapi;
pub mod visitors;
pub mod visits;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{error::AppError, AppState};

/// JSON body that has passed its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::MalformedInput(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // The kiosk UI may be served from another local origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Visitors
        .route("/visitors", get(visitors::list_visitors))
        .route("/visitors/detect/:national_id", get(visitors::detect_visitor))
        .route("/visitors/drafts/complete", post(visitors::complete_draft))
        .route("/visitors/:id", delete(visitors::deregister_visitor))
        .route("/visitors/:id/photos", put(visitors::attach_photos))
        // Visits
        .route("/visits", get(visits::list_visits))
        .route("/visits", post(visits::record_visit))
        .route("/visits/history/:national_id", get(visits::visit_history))
        .route("/visits/:id/checkout", post(visits::check_out))
        // Listing views
        .route("/snapshot", get(live::snapshot))
        .route("/live", get(live::live_updates))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
