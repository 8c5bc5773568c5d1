//! Duplicate visitor detection

use std::sync::Arc;

use crate::{error::AppResult, models::Visitor, repository::RecordStore};

#[derive(Clone)]
pub struct DuplicateDetector {
    store: Arc<dyn RecordStore>,
    min_length: usize,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn RecordStore>, min_length: usize) -> Self {
        Self { store, min_length }
    }

    /// Whether `national_id` is long enough to be looked up
    pub fn is_checkable(&self, national_id: &str) -> bool {
        national_id.trim().chars().count() >= self.min_length
    }

    /// Find the visitor already registered under `national_id`.
    ///
    /// Surrounding whitespace is ignored. Identifiers shorter than the configured
    /// minimum are treated as still being typed and return `None` without touching
    /// the store.
    pub async fn detect(&self, national_id: &str) -> AppResult<Option<Visitor>> {
        let national_id = national_id.trim();
        if !self.is_checkable(national_id) {
            return Ok(None);
        }

        let existing = self.store.get_visitor_by_national_id(national_id).await?;
        if let Some(ref visitor) = existing {
            tracing::debug!(
                "Returning visitor {} found for national ID {}",
                visitor.id,
                national_id
            );
        }
        Ok(existing)
    }
}
