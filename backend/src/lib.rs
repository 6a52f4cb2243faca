//! # Yoga Studio Tracker Backend
//!
//! Contains all non-UI logic for the yoga studio tracker application:
//! students, class sessions, and the prepaid-session balance ledger.
//!
//! This crate serves as the orchestration layer that brings together:
//! - **Domain**: Business logic and rules for students, sessions, balances
//! - **Storage**: Data persistence under a local data directory
//! - **Events**: Change notifications that let views refresh without polling
//!
//! The backend is UI-agnostic: any frontend (or a CLI, or a test) drives it
//! through the services on [`AppState`] and subscribes to the event bus.
//!
//! ## Architecture
//!
//! ```text
//! UI Layer (out of scope here)
//!     ↓ calls services / subscribes to events
//! Domain Layer (business logic, services)
//!     ↓
//! Storage Layer (JSON collections on disk)
//! ```

pub mod domain;
pub mod events;
pub mod storage;

pub use domain::*;
pub use events::*;
pub use storage::*;

use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Main application state that holds all services.
///
/// Every service shares one connection and one event bus, so a mutation
/// made through any of them is visible to the rest and announced once.
#[derive(Clone)]
pub struct AppState {
    pub student_service: StudentService<JsonConnection>,
    pub balance_service: BalanceService<JsonConnection>,
    pub session_service: SessionService<JsonConnection>,
    pub task_service: TaskService<JsonConnection>,
    pub settings_service: SettingsService<JsonConnection>,
    pub backup_service: BackupService<JsonConnection>,
    pub events: EventBus,
}

/// Initialize the backend with all required services, rooted at the
/// given data directory.
pub async fn initialize_backend<P: AsRef<Path>>(data_dir: P) -> Result<AppState> {
    info!("Setting up storage");
    let connection = Arc::new(JsonConnection::new(data_dir)?);

    info!("Setting up domain services");
    let events = EventBus::new();
    let settings_service = SettingsService::new(Arc::clone(&connection));
    let balance_service = BalanceService::new(Arc::clone(&connection), events.clone());
    let student_service = StudentService::new(Arc::clone(&connection), events.clone());
    let session_service = SessionService::new(
        Arc::clone(&connection),
        settings_service.clone(),
        events.clone(),
    );
    let task_service = TaskService::new(Arc::clone(&connection));
    let backup_service = BackupService::new(
        Arc::clone(&connection),
        settings_service.clone(),
        events.clone(),
    );

    Ok(AppState {
        student_service,
        balance_service,
        session_service,
        task_service,
        settings_service,
        backup_service,
        events,
    })
}
