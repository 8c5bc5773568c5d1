//! Visitor model

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

pub type VisitorId = i64;

static DATA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/[A-Za-z0-9.+-]+(;[A-Za-z0-9=.+-]+)*,").unwrap());

/// ID card image stored as a data URL (`data:image/jpeg;base64,...`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Photo(String);

impl Photo {
    /// Accept only image data URLs
    pub fn parse(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if DATA_URL.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::MalformedInput(
                "Photo must be an image data URL".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Front and back captures of an identity document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Photos {
    pub front: Option<Photo>,
    pub back: Option<Photo>,
}

impl Photos {
    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.back.is_none()
    }
}

/// Visitor identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Visitor {
    pub id: VisitorId,
    pub last_name: String,
    pub first_names: String,
    pub birth_date: NaiveDate,
    pub birth_place: String,
    pub phone: String,
    /// Natural key, unique across visitors
    pub national_id_number: String,
    pub occupation: String,
    pub front_photo: Option<Photo>,
    pub back_photo: Option<Photo>,
}

impl Visitor {
    pub fn photos(&self) -> Photos {
        Photos {
            front: self.front_photo.clone(),
            back: self.back_photo.clone(),
        }
    }
}

/// Complete visitor draft, ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct VisitorFields {
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "First names are required"))]
    pub first_names: String,
    pub birth_date: NaiveDate,
    #[validate(length(min = 1, message = "Birth place is required"))]
    pub birth_place: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 8, message = "National ID number must be at least 8 characters"))]
    pub national_id_number: String,
    #[validate(length(min = 1, message = "Occupation is required"))]
    pub occupation: String,
}

impl VisitorFields {
    /// Copy with surrounding whitespace stripped from every text field
    pub fn normalized(&self) -> VisitorFields {
        VisitorFields {
            last_name: self.last_name.trim().to_string(),
            first_names: self.first_names.trim().to_string(),
            birth_date: self.birth_date,
            birth_place: self.birth_place.trim().to_string(),
            phone: self.phone.trim().to_string(),
            national_id_number: self.national_id_number.trim().to_string(),
            occupation: self.occupation.trim().to_string(),
        }
    }
}

/// Partial visitor draft, as produced by the ID card scanner or a half-filled form.
///
/// Every field is untrusted and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VisitorDraft {
    pub last_name: Option<String>,
    pub first_names: Option<String>,
    /// YYYY-MM-DD or DD/MM/YYYY
    pub birth_date: Option<String>,
    pub birth_place: Option<String>,
    pub phone: Option<String>,
    pub national_id_number: Option<String>,
    pub occupation: Option<String>,
}

impl VisitorDraft {
    /// Overlay `other` on top of this draft; non-empty values in `other` win
    pub fn merge(self, other: VisitorDraft) -> VisitorDraft {
        fn pick(base: Option<String>, over: Option<String>) -> Option<String> {
            match over {
                Some(v) if !v.trim().is_empty() => Some(v),
                _ => base,
            }
        }

        VisitorDraft {
            last_name: pick(self.last_name, other.last_name),
            first_names: pick(self.first_names, other.first_names),
            birth_date: pick(self.birth_date, other.birth_date),
            birth_place: pick(self.birth_place, other.birth_place),
            phone: pick(self.phone, other.phone),
            national_id_number: pick(self.national_id_number, other.national_id_number),
            occupation: pick(self.occupation, other.occupation),
        }
    }
}

fn parse_birth_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

impl TryFrom<VisitorDraft> for VisitorFields {
    type Error = AppError;

    fn try_from(draft: VisitorDraft) -> AppResult<Self> {
        let mut missing = Vec::new();

        let mut take = |value: Option<String>, name: &'static str| -> String {
            let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
            if value.is_empty() {
                missing.push(name);
            }
            value
        };

        let last_name = take(draft.last_name, "last_name");
        let first_names = take(draft.first_names, "first_names");
        let birth_date = take(draft.birth_date, "birth_date");
        let birth_place = take(draft.birth_place, "birth_place");
        let phone = take(draft.phone, "phone");
        let national_id_number = take(draft.national_id_number, "national_id_number");
        let occupation = take(draft.occupation, "occupation");

        if !missing.is_empty() {
            return Err(AppError::MalformedInput(format!(
                "Missing fields: {}",
                missing.join(", ")
            )));
        }

        let birth_date = parse_birth_date(&birth_date).ok_or_else(|| {
            AppError::MalformedInput(format!("Invalid birth_date: {}", birth_date))
        })?;

        let fields = VisitorFields {
            last_name,
            first_names,
            birth_date,
            birth_place,
            phone,
            national_id_number,
            occupation,
        };
        fields.validate()?;
        Ok(fields)
    }
}
