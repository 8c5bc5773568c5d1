//! Business logic services

pub mod duplicates;
pub mod history;
pub mod live_view;
pub mod registration;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{LiveViewConfig, RegistrationConfig},
    repository::RecordStore,
};

/// Container for all services, sharing one store handle
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub duplicates: duplicates::DuplicateDetector,
    pub history: history::HistoryResolver,
    pub registration: registration::RegistrationService,
    refresh_interval: Duration,
}

impl Services {
    /// Create all services around the given store
    pub fn new(
        store: Arc<dyn RecordStore>,
        registration_config: &RegistrationConfig,
        live_view_config: &LiveViewConfig,
    ) -> Self {
        let duplicates =
            duplicates::DuplicateDetector::new(store.clone(), registration_config.duplicate_min_length);

        Self {
            history: history::HistoryResolver::new(store.clone()),
            registration: registration::RegistrationService::new(store.clone(), duplicates.clone()),
            duplicates,
            refresh_interval: live_view_config.refresh_interval(),
            store,
        }
    }

    /// Open a live view for one listing screen
    pub fn live_view(&self) -> live_view::LiveView {
        live_view::LiveView::start(self.store.clone(), self.refresh_interval)
    }
}
