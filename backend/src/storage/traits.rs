//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use shared::{AppSettings, Session, Student};

/// Trait defining the interface for student storage operations
///
/// This trait abstracts away the specific storage implementation details,
/// allowing the domain layer to work with different storage backends
/// without modification.
#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// Store a student, inserting when the id is new and replacing otherwise
    async fn store_student(&self, student: &Student) -> Result<()>;

    /// Retrieve a specific student by ID
    async fn get_student(&self, student_id: &str) -> Result<Option<Student>>;

    /// List all students. A missing collection reads as empty, never an error.
    async fn list_students(&self) -> Result<Vec<Student>>;

    /// Delete a student by ID
    /// Returns true if the student was found and deleted, false otherwise
    async fn delete_student(&self, student_id: &str) -> Result<bool>;

    /// Replace the whole collection (backup restore)
    async fn replace_students(&self, students: &[Student]) -> Result<()>;
}

/// Trait defining the interface for session storage operations
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Store a session, inserting when the id is new and replacing otherwise
    async fn store_session(&self, session: &Session) -> Result<()>;

    /// Retrieve a specific session by ID
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// List all sessions. A missing collection reads as empty, never an error.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// List all sessions whose attendee list contains the given student
    async fn list_sessions_for_student(&self, student_id: &str) -> Result<Vec<Session>>;

    /// Delete a session by ID
    /// Returns true if the session was found and deleted, false otherwise
    async fn delete_session(&self, session_id: &str) -> Result<bool>;

    /// Replace the whole collection (backup restore)
    async fn replace_sessions(&self, sessions: &[Session]) -> Result<()>;
}

/// Trait defining the interface for settings storage operations
#[async_trait]
pub trait SettingsStorage: Send + Sync {
    /// Load the settings record; None when no record has been written yet.
    /// Missing fields on an old record are filled with the hardcoded
    /// defaults during deserialization.
    async fn load_settings(&self) -> Result<Option<AppSettings>>;

    /// Persist the settings record
    async fn save_settings(&self, settings: &AppSettings) -> Result<()>;
}

/// Trait defining the interface for storage connections
///
/// Abstracts away the specific connection type and provides factory
/// methods for creating repositories, so the domain layer can work with
/// any storage backend without knowing the implementation details.
pub trait Connection: Send + Sync + Clone {
    /// The type of StudentStorage this connection creates
    type StudentRepository: StudentStorage + Clone;

    /// The type of SessionStorage this connection creates
    type SessionRepository: SessionStorage + Clone;

    /// The type of SettingsStorage this connection creates
    type SettingsRepository: SettingsStorage + Clone;

    /// Create a new student repository for this connection
    fn create_student_repository(&self) -> Self::StudentRepository;

    /// Create a new session repository for this connection
    fn create_session_repository(&self) -> Self::SessionRepository;

    /// Create a new settings repository for this connection
    fn create_settings_repository(&self) -> Self::SettingsRepository;
}
