//! Error types for Guerite server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error codes returned to the kiosk UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 2,
    StorageUnavailable = 3,
    NoSuchVisitor = 4,
    NoSuchVisit = 5,
    Duplicate = 6,
    BadValue = 7,
}

/// Kind of record a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Visitor,
    Visit,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Visitor => write!(f, "Visitor"),
            Entity::Visit => write!(f, "Visit"),
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A visitor with the same national ID number already exists
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// The device database could not be opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is the duplicate national ID conflict
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, AppError::ConstraintViolation(_))
    }

    pub fn visitor_not_found(id: i64) -> Self {
        AppError::NotFound {
            entity: Entity::Visitor,
            id,
        }
    }

    pub fn visit_not_found(id: i64) -> Self {
        AppError::NotFound {
            entity: Entity::Visit,
            id,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            AppError::ConstraintViolation(_) => ErrorCode::Duplicate,
            AppError::NotFound {
                entity: Entity::Visitor,
                ..
            } => ErrorCode::NoSuchVisitor,
            AppError::NotFound {
                entity: Entity::Visit,
                ..
            } => ErrorCode::NoSuchVisit,
            AppError::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
            AppError::MalformedInput(_) => ErrorCode::BadValue,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::MalformedInput(errors.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::StorageUnavailable(format!("schema setup failed: {}", error))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::ConstraintViolation(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::StorageUnavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::MalformedInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
