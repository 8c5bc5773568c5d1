//! Visit history resolution

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Visit, Visitor, VisitorWithHistory},
    repository::RecordStore,
};

/// Display order: most recent `(visit_date, entry_time)` first, then newest id first
pub fn newest_first(a: &Visit, b: &Visit) -> Ordering {
    (b.visit_date, b.entry_time_of_day(), b.id).cmp(&(a.visit_date, a.entry_time_of_day(), a.id))
}

/// Pair every visitor with its visits, visitors sorted by name
pub fn with_history(visitors: &[Visitor], visits: &[Visit]) -> Vec<VisitorWithHistory> {
    let mut by_national_id: HashMap<&str, Vec<Visit>> = HashMap::new();
    for visit in visits {
        by_national_id
            .entry(visit.national_id_number.as_str())
            .or_default()
            .push(visit.clone());
    }

    let mut rows: Vec<VisitorWithHistory> = visitors
        .iter()
        .map(|visitor| {
            let mut visits = by_national_id
                .remove(visitor.national_id_number.as_str())
                .unwrap_or_default();
            visits.sort_by(newest_first);
            VisitorWithHistory {
                visitor: visitor.clone(),
                total_visits: visits.len(),
                last_visit: visits.first().cloned(),
                visits,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        (&a.visitor.last_name, &a.visitor.first_names, a.visitor.id)
            .cmp(&(&b.visitor.last_name, &b.visitor.first_names, b.visitor.id))
    });
    rows
}

#[derive(Clone)]
pub struct HistoryResolver {
    store: Arc<dyn RecordStore>,
}

impl HistoryResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All visits for `national_id`, most recent first
    pub async fn history_for(&self, national_id: &str) -> AppResult<Vec<Visit>> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Ok(Vec::new());
        }

        let mut visits = self.store.list_visits_by_national_id(national_id).await?;
        visits.sort_by(newest_first);
        Ok(visits)
    }

    /// Every visitor with its history, for listing and export
    pub async fn visitors_with_history(&self) -> AppResult<Vec<VisitorWithHistory>> {
        let visitors = self.store.list_visitors().await?;
        let visits = self.store.list_visits().await?;
        Ok(with_history(&visitors, &visits))
    }
}
