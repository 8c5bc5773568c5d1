//! Visit model

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::visitor::VisitorId;
use crate::error::{AppError, AppResult};

pub type VisitId = i64;

/// Time-of-day format used for entry and exit times
pub const TIME_FORMAT: &str = "%H:%M:%S";

static TIME_OF_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9]$").unwrap());

/// Check an `HH:MM:SS` time-of-day string
pub fn validate_time_of_day(value: &str) -> AppResult<()> {
    if TIME_OF_DAY.is_match(value) {
        Ok(())
    } else {
        Err(AppError::MalformedInput(format!(
            "Invalid time of day '{}', expected HH:MM:SS",
            value
        )))
    }
}

/// One recorded presence of a visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Visit {
    pub id: VisitId,
    pub visitor_id: VisitorId,
    /// Copy of the visitor's national ID number at creation time
    pub national_id_number: String,
    pub visit_date: NaiveDate,
    /// Entry time (HH:MM:SS)
    pub entry_time: String,
    /// Exit time (HH:MM:SS), set on check-out
    pub exit_time: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl Visit {
    /// Parsed entry time; `None` when the stored text is not a time of day
    pub fn entry_time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.entry_time, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&self.entry_time, "%H:%M"))
            .ok()
    }
}

/// Visit draft, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewVisit {
    pub visitor_id: VisitorId,
    pub national_id_number: String,
    pub visit_date: NaiveDate,
    pub entry_time: String,
    pub exit_time: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}
