//! Visitors API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Photo, Photos, Visit, Visitor, VisitorDraft, VisitorFields, VisitorId, VisitorWithHistory},
    AppState,
};

/// Photo payloads as sent by the capture screen (data URLs)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PhotosRequest {
    pub front_photo: Option<String>,
    pub back_photo: Option<String>,
}

impl PhotosRequest {
    /// Validate the data URLs; empty strings count as "no capture"
    pub fn into_photos(self) -> AppResult<Photos> {
        fn parse(value: Option<String>) -> AppResult<Option<Photo>> {
            value
                .filter(|v| !v.is_empty())
                .map(Photo::parse)
                .transpose()
        }

        Ok(Photos {
            front: parse(self.front_photo)?,
            back: parse(self.back_photo)?,
        })
    }
}

/// Duplicate check result
#[derive(Debug, Serialize, ToSchema)]
pub struct DetectResponse {
    /// `false` when the identifier was too short to be looked up
    pub checked: bool,
    pub visitor: Option<Visitor>,
    /// Visit history of the returning visitor, most recent first
    pub history: Vec<Visit>,
}

/// List all visitors with their visit history
#[utoipa::path(
    get,
    path = "/visitors",
    tag = "visitors",
    responses(
        (status = 200, description = "Visitors with history", body = Vec<VisitorWithHistory>)
    )
)]
pub async fn list_visitors(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<VisitorWithHistory>>> {
    let rows = state.services.history.visitors_with_history().await?;
    Ok(Json(rows))
}

/// Check whether a national ID number belongs to a returning visitor
#[utoipa::path(
    get,
    path = "/visitors/detect/{national_id}",
    tag = "visitors",
    params(("national_id" = String, Path, description = "National ID number, possibly partial")),
    responses(
        (status = 200, description = "Detection result", body = DetectResponse)
    )
)]
pub async fn detect_visitor(
    State(state): State<AppState>,
    Path(national_id): Path<String>,
) -> AppResult<Json<DetectResponse>> {
    let services = &state.services;
    let checked = services.duplicates.is_checkable(&national_id);

    let visitor = services.duplicates.detect(&national_id).await?;
    let history = match visitor {
        Some(_) => services.history.history_for(&national_id).await?,
        None => Vec::new(),
    };

    Ok(Json(DetectResponse {
        checked,
        visitor,
        history,
    }))
}

/// Complete a partial draft (e.g. from the ID card scanner)
#[utoipa::path(
    post,
    path = "/visitors/drafts/complete",
    tag = "visitors",
    request_body = VisitorDraft,
    responses(
        (status = 200, description = "Draft is complete", body = VisitorFields),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete_draft(Json(draft): Json<VisitorDraft>) -> AppResult<Json<VisitorFields>> {
    let fields = VisitorFields::try_from(draft)?;
    Ok(Json(fields))
}

/// Delete a visitor and all of its visits
#[utoipa::path(
    delete,
    path = "/visitors/{id}",
    tag = "visitors",
    params(("id" = i64, Path, description = "Visitor ID")),
    responses(
        (status = 204, description = "Visitor deleted (or already absent)")
    )
)]
pub async fn deregister_visitor(
    State(state): State<AppState>,
    Path(id): Path<VisitorId>,
) -> AppResult<StatusCode> {
    state.services.registration.deregister_visitor(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attach or replace ID card photos
#[utoipa::path(
    put,
    path = "/visitors/{id}/photos",
    tag = "visitors",
    params(("id" = i64, Path, description = "Visitor ID")),
    request_body = PhotosRequest,
    responses(
        (status = 200, description = "Updated visitor", body = Visitor),
        (status = 404, description = "Visitor not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn attach_photos(
    State(state): State<AppState>,
    Path(id): Path<VisitorId>,
    Json(request): Json<PhotosRequest>,
) -> AppResult<Json<Visitor>> {
    let photos = request.into_photos()?;
    let visitor = state.services.registration.attach_photos(id, photos).await?;
    Ok(Json(visitor))
}
