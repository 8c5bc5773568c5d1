//! Repository layer: device-local record store

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    config::{DatabaseConfig, StoreBackend},
    error::AppResult,
    models::{NewVisit, Photo, Visit, VisitId, Visitor, VisitorFields, VisitorId},
};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Schema version of the persisted layout
pub const SCHEMA_VERSION: i64 = 1;

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Committed mutation, published after the store acknowledges it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    VisitorCreated(VisitorId),
    VisitorDeleted(VisitorId),
    VisitorPhotosUpdated(VisitorId),
    VisitCreated(VisitId),
    VisitUpdated(VisitId),
}

pub(crate) fn change_channel() -> broadcast::Sender<StoreChange> {
    broadcast::channel(CHANGE_CHANNEL_CAPACITY).0
}

/// Visitor and visit storage.
///
/// Every operation is atomic on its own. Uniqueness of the national ID number is
/// enforced here, not by callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a visitor. Fails with `ConstraintViolation` if the national ID exists.
    async fn create_visitor(&self, draft: &VisitorFields) -> AppResult<VisitorId>;
    async fn get_visitor(&self, id: VisitorId) -> AppResult<Option<Visitor>>;
    async fn get_visitor_by_national_id(&self, national_id: &str) -> AppResult<Option<Visitor>>;
    async fn list_visitors(&self) -> AppResult<Vec<Visitor>>;
    /// Remove a visitor and all of its visits. No-op when absent.
    async fn delete_visitor(&self, id: VisitorId) -> AppResult<()>;
    /// Set both photo slots. Fails with `NotFound` when the visitor is gone.
    async fn update_visitor_photos(
        &self,
        id: VisitorId,
        front: Option<Photo>,
        back: Option<Photo>,
    ) -> AppResult<()>;

    async fn create_visit(&self, draft: &NewVisit) -> AppResult<VisitId>;
    /// Visits for a national ID, in no particular order
    async fn list_visits_by_national_id(&self, national_id: &str) -> AppResult<Vec<Visit>>;
    async fn list_visits(&self) -> AppResult<Vec<Visit>>;
    /// Set the exit time. Returns `false` when no visit has this id.
    async fn update_visit_exit(&self, id: VisitId, exit_time: &str) -> AppResult<bool>;

    /// Receive a notification for every committed mutation
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    async fn health_check(&self) -> AppResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Open the configured store backend
pub async fn open_store(config: &DatabaseConfig) -> AppResult<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(config).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, records will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };
    Ok(store)
}
