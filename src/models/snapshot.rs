//! Listing views: snapshot and visitor-with-history aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{visit::Visit, visitor::Visitor};

/// Full copy of the store contents used by listing views
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Snapshot {
    pub visitors: Vec<Visitor>,
    pub visits: Vec<Visit>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Visitor together with its ordered visit history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisitorWithHistory {
    pub visitor: Visitor,
    /// Most recent first
    pub visits: Vec<Visit>,
    pub total_visits: usize,
    pub last_visit: Option<Visit>,
}
