//! Visits API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{visitors::PhotosRequest, ValidatedJson};
use crate::{
    error::AppResult,
    models::{Visit, VisitId, VisitorFields},
    services::registration::RecordedVisit,
    AppState,
};

/// Register a visit
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordVisitRequest {
    #[validate(nested)]
    pub visitor: VisitorFields,
    #[serde(default)]
    pub front_photo: Option<String>,
    #[serde(default)]
    pub back_photo: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckOutRequest {
    /// HH:MM:SS, defaults to now
    pub exit_time: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckOutResponse {
    pub visit_id: VisitId,
    pub exit_time: String,
}

/// List all visits
#[utoipa::path(
    get,
    path = "/visits",
    tag = "visits",
    responses(
        (status = 200, description = "All visits", body = Vec<Visit>)
    )
)]
pub async fn list_visits(State(state): State<AppState>) -> AppResult<Json<Vec<Visit>>> {
    let visits = state.services.store.list_visits().await?;
    Ok(Json(visits))
}

/// Register a visit, creating the visitor on first visit
#[utoipa::path(
    post,
    path = "/visits",
    tag = "visits",
    request_body = RecordVisitRequest,
    responses(
        (status = 201, description = "Visit recorded", body = RecordedVisit),
        (status = 400, description = "Invalid visitor fields", body = crate::error::ErrorResponse),
        (status = 409, description = "National ID conflict could not be resolved", body = crate::error::ErrorResponse)
    )
)]
pub async fn record_visit(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RecordVisitRequest>,
) -> AppResult<(StatusCode, Json<RecordedVisit>)> {
    let photos = PhotosRequest {
        front_photo: request.front_photo,
        back_photo: request.back_photo,
    }
    .into_photos()?;

    let recorded = state
        .services
        .registration
        .record_visit(&request.visitor, photos)
        .await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// Visit history for a national ID number, most recent first
#[utoipa::path(
    get,
    path = "/visits/history/{national_id}",
    tag = "visits",
    params(("national_id" = String, Path, description = "National ID number")),
    responses(
        (status = 200, description = "Visit history", body = Vec<Visit>)
    )
)]
pub async fn visit_history(
    State(state): State<AppState>,
    Path(national_id): Path<String>,
) -> AppResult<Json<Vec<Visit>>> {
    let visits = state.services.history.history_for(&national_id).await?;
    Ok(Json(visits))
}

/// Record the exit time of a visit
#[utoipa::path(
    post,
    path = "/visits/{id}/checkout",
    tag = "visits",
    params(("id" = i64, Path, description = "Visit ID")),
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Exit time stored", body = CheckOutResponse),
        (status = 404, description = "Visit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn check_out(
    State(state): State<AppState>,
    Path(id): Path<VisitId>,
    Json(request): Json<CheckOutRequest>,
) -> AppResult<Json<CheckOutResponse>> {
    let exit_time = state
        .services
        .registration
        .check_out(id, request.exit_time)
        .await?;
    Ok(Json(CheckOutResponse {
        visit_id: id,
        exit_time,
    }))
}
