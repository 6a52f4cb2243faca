#[derive(Debug, thiserror::Error)]
pub enum SessionValidationError {
    #[error("Start time '{0}' is not one of the bookable 30-minute slots")]
    InvalidStartTime(String),
    #[error("Session duration must be 60, 90 or 120 minutes, got {0}")]
    InvalidDuration(u32),
    #[error("A session with start time '{0}' and duration {1} would run past the last bookable slot")]
    EndTimeOutOfRange(String, u32),
    #[error("A session needs at least one attendee")]
    NoAttendees,
}
