//! # Storage Module
//!
//! Handles all data persistence operations for the yoga studio tracker.
//!
//! This module abstracts away the specific storage implementation details
//! and provides a consistent interface for persisting and retrieving data.
//! The implementation can be swapped out without affecting the domain
//! logic layer.
//!
//! ## Key Responsibilities
//!
//! - **Data Persistence**: Saving students, sessions and settings to disk
//! - **Data Retrieval**: Loading stored data back into memory
//! - **Schema Tolerance**: Repairing legacy records in one place at load
//!   time instead of scattering per-field defaulting across read sites
//! - **Atomic Writes**: Swapping collections in via temp-file-then-rename
//!
//! ## Current Implementation
//!
//! - **Primary Storage**: one JSON document per collection under a local
//!   data directory (`students.json`, `sessions.json`, `settings.json`)
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: Clean separation between domain and data access
//! - **Dependency Inversion**: Domain depends on storage abstractions, not
//!   implementations
//! - **Testability**: Repositories run against any temp directory

pub mod json;
pub mod traits;

pub use json::JsonConnection;
pub use traits::{Connection, SessionStorage, SettingsStorage, StudentStorage};
