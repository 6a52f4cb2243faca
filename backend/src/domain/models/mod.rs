//! Validation error types for the domain services.

pub mod session;
pub mod settings;
pub mod student;

pub use session::SessionValidationError;
pub use settings::SettingsValidationError;
pub use student::StudentValidationError;
