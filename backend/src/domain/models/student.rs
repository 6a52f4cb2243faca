#[derive(Debug, thiserror::Error)]
pub enum StudentValidationError {
    #[error("Student name cannot be empty")]
    EmptyName,
    #[error("Student name cannot exceed 100 characters")]
    NameTooLong,
    #[error("Note content cannot be empty")]
    EmptyNoteContent,
}
