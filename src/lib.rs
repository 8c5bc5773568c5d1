//! Guerite visitor registration kiosk
//!
//! Device-local server for the kiosk UI: stores visitors and their visits,
//! recognises returning visitors by national ID number, and keeps listing
//! views up to date.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
