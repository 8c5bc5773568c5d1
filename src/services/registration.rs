//! Visitor registration: create-or-reuse the visitor, then record the visit

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use super::duplicates::DuplicateDetector;
use crate::{
    error::{AppError, AppResult},
    models::{
        visit::{validate_time_of_day, TIME_FORMAT},
        NewVisit, Photos, VisitId, Visitor, VisitorFields, VisitorId,
    },
    repository::RecordStore,
};

/// Outcome of a visit registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecordedVisit {
    pub visitor_id: VisitorId,
    pub visit_id: VisitId,
    /// `false` for a returning visitor
    pub is_new_visitor: bool,
}

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RecordStore>,
    detector: DuplicateDetector,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn RecordStore>, detector: DuplicateDetector) -> Self {
        Self { store, detector }
    }

    /// Register a visit happening now
    pub async fn record_visit(
        &self,
        fields: &VisitorFields,
        photos: Photos,
    ) -> AppResult<RecordedVisit> {
        self.record_visit_at(fields, photos, Local::now().naive_local())
            .await
    }

    /// Register a visit at `now`.
    ///
    /// Fields are trimmed and validated before anything is stored. A returning
    /// visitor keeps the descriptive fields it was first registered with; only its
    /// photos may be replaced.
    pub async fn record_visit_at(
        &self,
        fields: &VisitorFields,
        photos: Photos,
        now: NaiveDateTime,
    ) -> AppResult<RecordedVisit> {
        let fields = fields.normalized();
        fields.validate()?;

        let (visitor_id, existing) = self.resolve_visitor(&fields).await?;

        let visit = NewVisit {
            visitor_id,
            national_id_number: fields.national_id_number.clone(),
            visit_date: now.date(),
            entry_time: now.format(TIME_FORMAT).to_string(),
            exit_time: None,
            reason: None,
            notes: None,
        };
        let visit_id = self.store.create_visit(&visit).await?;

        if !photos.is_empty() {
            let photos = match existing {
                Some(ref visitor) => merge_photos(visitor, photos),
                None => photos,
            };
            self.store
                .update_visitor_photos(visitor_id, photos.front, photos.back)
                .await?;
        }

        let is_new_visitor = existing.is_none();
        tracing::info!(
            "Recorded visit {} for {} visitor {}",
            visit_id,
            if is_new_visitor { "new" } else { "returning" },
            visitor_id
        );

        Ok(RecordedVisit {
            visitor_id,
            visit_id,
            is_new_visitor,
        })
    }

    /// Existing visitor id, or the id of a freshly created one.
    ///
    /// A concurrent registration of the same national ID can win the insert; the
    /// constraint violation is then answered with one more lookup and nothing else.
    async fn resolve_visitor(
        &self,
        fields: &VisitorFields,
    ) -> AppResult<(VisitorId, Option<Visitor>)> {
        let national_id = &fields.national_id_number;

        if let Some(existing) = self.detector.detect(national_id).await? {
            return Ok((existing.id, Some(existing)));
        }

        match self.store.create_visitor(fields).await {
            Ok(id) => Ok((id, None)),
            Err(e) if e.is_constraint_violation() => {
                tracing::warn!(
                    "National ID {} registered concurrently, reusing existing visitor",
                    national_id
                );
                match self.detector.detect(national_id).await? {
                    Some(existing) => Ok((existing.id, Some(existing))),
                    None => {
                        tracing::error!(
                            "National ID {} still conflicts after retry, giving up",
                            national_id
                        );
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Remove a visitor and its whole visit history. Absent ids are ignored.
    pub async fn deregister_visitor(&self, visitor_id: VisitorId) -> AppResult<()> {
        self.store.delete_visitor(visitor_id).await?;
        tracing::info!("Deregistered visitor {}", visitor_id);
        Ok(())
    }

    /// Replace the supplied photo slots of an existing visitor
    pub async fn attach_photos(&self, visitor_id: VisitorId, photos: Photos) -> AppResult<Visitor> {
        let visitor = self
            .store
            .get_visitor(visitor_id)
            .await?
            .ok_or_else(|| AppError::visitor_not_found(visitor_id))?;

        let photos = merge_photos(&visitor, photos);
        self.store
            .update_visitor_photos(visitor_id, photos.front.clone(), photos.back.clone())
            .await?;

        Ok(Visitor {
            front_photo: photos.front,
            back_photo: photos.back,
            ..visitor
        })
    }

    /// Set the exit time of a visit, defaulting to the current local time.
    ///
    /// Returns the stored exit time. Calling it again overwrites the previous value.
    pub async fn check_out(&self, visit_id: VisitId, exit_time: Option<String>) -> AppResult<String> {
        let exit_time = match exit_time {
            Some(time) => {
                validate_time_of_day(&time)?;
                time
            }
            None => Local::now().format(TIME_FORMAT).to_string(),
        };

        if !self.store.update_visit_exit(visit_id, &exit_time).await? {
            return Err(AppError::visit_not_found(visit_id));
        }

        tracing::info!("Visit {} checked out at {}", visit_id, exit_time);
        Ok(exit_time)
    }
}

/// Supplied photos replace stored ones, missing ones keep the stored value
fn merge_photos(visitor: &Visitor, photos: Photos) -> Photos {
    Photos {
        front: photos.front.or_else(|| visitor.front_photo.clone()),
        back: photos.back.or_else(|| visitor.back_photo.clone()),
    }
}
