//! In-memory record store.
//!
//! Implements `RecordStore` with plain collections behind one `tokio::sync::RwLock`.
//! Used by tests and by kiosks configured without a database file.
//!
//! - **Not durable**: everything is lost when the process exits.
//! - **Atomic per call**: each operation takes the write (or read) lock once, so a
//!   uniqueness check and its insert can never interleave with another writer.
//! - Ids come from counters that only grow, so deleted ids are never handed out again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use super::{change_channel, RecordStore, StoreChange};
use crate::{
    error::{AppError, AppResult},
    models::{NewVisit, Photo, Visit, VisitId, Visitor, VisitorFields, VisitorId},
};

#[derive(Debug, Default)]
struct State {
    next_visitor_id: VisitorId,
    next_visit_id: VisitId,
    visitors: BTreeMap<VisitorId, Visitor>,
    visits: BTreeMap<VisitId, Visit>,
    /// Unique index: national ID number -> visitor id
    visitors_by_national_id: HashMap<String, VisitorId>,
}

#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    changes: broadcast::Sender<StoreChange>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            changes: change_channel(),
        }
    }

    fn publish(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create_visitor(&self, draft: &VisitorFields) -> AppResult<VisitorId> {
        let id = {
            let mut state = self.state.write().await;
            if state
                .visitors_by_national_id
                .contains_key(&draft.national_id_number)
            {
                return Err(AppError::ConstraintViolation(format!(
                    "Visitor with national ID {} already exists",
                    draft.national_id_number
                )));
            }

            state.next_visitor_id += 1;
            let id = state.next_visitor_id;
            state
                .visitors_by_national_id
                .insert(draft.national_id_number.clone(), id);
            state.visitors.insert(
                id,
                Visitor {
                    id,
                    last_name: draft.last_name.clone(),
                    first_names: draft.first_names.clone(),
                    birth_date: draft.birth_date,
                    birth_place: draft.birth_place.clone(),
                    phone: draft.phone.clone(),
                    national_id_number: draft.national_id_number.clone(),
                    occupation: draft.occupation.clone(),
                    front_photo: None,
                    back_photo: None,
                },
            );
            id
        };

        self.publish(StoreChange::VisitorCreated(id));
        Ok(id)
    }

    async fn get_visitor(&self, id: VisitorId) -> AppResult<Option<Visitor>> {
        Ok(self.state.read().await.visitors.get(&id).cloned())
    }

    async fn get_visitor_by_national_id(&self, national_id: &str) -> AppResult<Option<Visitor>> {
        let state = self.state.read().await;
        Ok(state
            .visitors_by_national_id
            .get(national_id)
            .and_then(|id| state.visitors.get(id))
            .cloned())
    }

    async fn list_visitors(&self) -> AppResult<Vec<Visitor>> {
        Ok(self.state.read().await.visitors.values().cloned().collect())
    }

    async fn delete_visitor(&self, id: VisitorId) -> AppResult<()> {
        let removed = {
            let mut state = self.state.write().await;
            let visitor = state.visitors.remove(&id);
            if let Some(ref visitor) = visitor {
                state
                    .visitors_by_national_id
                    .remove(&visitor.national_id_number);
            }
            let before = state.visits.len();
            state.visits.retain(|_, visit| visit.visitor_id != id);
            visitor.is_some() || state.visits.len() != before
        };

        if removed {
            self.publish(StoreChange::VisitorDeleted(id));
        }
        Ok(())
    }

    async fn update_visitor_photos(
        &self,
        id: VisitorId,
        front: Option<Photo>,
        back: Option<Photo>,
    ) -> AppResult<()> {
        {
            let mut state = self.state.write().await;
            let visitor = state
                .visitors
                .get_mut(&id)
                .ok_or_else(|| AppError::visitor_not_found(id))?;
            visitor.front_photo = front;
            visitor.back_photo = back;
        }

        self.publish(StoreChange::VisitorPhotosUpdated(id));
        Ok(())
    }

    async fn create_visit(&self, draft: &NewVisit) -> AppResult<VisitId> {
        let id = {
            let mut state = self.state.write().await;
            state.next_visit_id += 1;
            let id = state.next_visit_id;
            state.visits.insert(
                id,
                Visit {
                    id,
                    visitor_id: draft.visitor_id,
                    national_id_number: draft.national_id_number.clone(),
                    visit_date: draft.visit_date,
                    entry_time: draft.entry_time.clone(),
                    exit_time: draft.exit_time.clone(),
                    reason: draft.reason.clone(),
                    notes: draft.notes.clone(),
                },
            );
            id
        };

        self.publish(StoreChange::VisitCreated(id));
        Ok(id)
    }

    async fn list_visits_by_national_id(&self, national_id: &str) -> AppResult<Vec<Visit>> {
        Ok(self
            .state
            .read()
            .await
            .visits
            .values()
            .filter(|visit| visit.national_id_number == national_id)
            .cloned()
            .collect())
    }

    async fn list_visits(&self) -> AppResult<Vec<Visit>> {
        Ok(self.state.read().await.visits.values().cloned().collect())
    }

    async fn update_visit_exit(&self, id: VisitId, exit_time: &str) -> AppResult<bool> {
        let updated = {
            let mut state = self.state.write().await;
            match state.visits.get_mut(&id) {
                Some(visit) => {
                    visit.exit_time = Some(exit_time.to_string());
                    true
                }
                None => false,
            }
        };

        if updated {
            self.publish(StoreChange::VisitUpdated(id));
        }
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
