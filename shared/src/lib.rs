use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Earliest bookable time slot of the day.
pub const FIRST_TIME_SLOT: &str = "06:00";
/// Latest bookable time slot of the day.
pub const LAST_TIME_SLOT: &str = "22:00";
/// Allowed session lengths in minutes.
pub const SESSION_DURATIONS_MINUTES: [u32; 3] = [60, 90, 120];

/// A student enrolled with the instructor.
///
/// Student ID in format: "student::epoch_millis"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// Display name (required, non-empty after trimming)
    pub name: String,
    /// Contact phone, free text
    pub phone: Option<String>,
    /// Signed count of prepaid sessions. Positive = the student owes
    /// sessions (consumed more than paid for), negative = the student
    /// has credit. Always a whole number of sessions.
    pub balance: i64,
    /// Personal goal tags; display order is insertion order
    pub goals: Vec<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub birthday: Option<NaiveDate>,
    pub member_since: Option<NaiveDate>,
    pub description: Option<String>,
    /// Notes owned exclusively by this student
    pub notes: Vec<StudentNote>,
    /// Append-only history of every balance change
    pub balance_transactions: Vec<BalanceTransaction>,
    /// Set once at creation, immutable thereafter
    pub created_at: DateTime<Utc>,
}

/// A free-text note attached to one student.
///
/// Note ID in format: "note::epoch_millis"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentNote {
    pub id: String,
    pub content: String,
    /// Creation time, immutable
    pub timestamp: DateTime<Utc>,
    /// Stamped on every edit
    pub updated_at: Option<DateTime<Utc>>,
}

/// Direction of a balance change, derived from the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Balance increased (credit added)
    Added,
    /// Balance decreased (sessions consumed); zero amounts also land here
    Deducted,
}

/// One entry in a student's balance ledger.
///
/// Transaction ID in format: "transaction::<added|deducted>::epoch_millis"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceTransaction {
    pub id: String,
    /// Effective time of the change: creation time for manual entries,
    /// completion time for session settlements
    pub date: DateTime<Utc>,
    pub transaction_type: TransactionType,
    /// Signed whole number of sessions; positive = credit added,
    /// negative = sessions consumed
    pub change_amount: i64,
    pub reason: String,
    pub reason_en: Option<String>,
    pub reason_ru: Option<String>,
    /// Snapshot of the student's balance immediately after this entry
    pub balance_after: i64,
}

/// Kind of class session; each kind carries its own default per-attendee charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    Team,
    Individual,
}

/// Lifecycle state of a session. Scheduled is the initial state;
/// Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// One scheduled yoga class instance.
///
/// Session ID in format: "session::epoch_millis"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Calendar day of the class
    pub date: NaiveDate,
    /// "HH:MM", one of the fixed 30-minute slots between 06:00 and 22:00
    pub start_time: String,
    /// "HH:MM", always derived as start_time + duration; never entered directly
    pub end_time: String,
    /// Attendee ids, in scheduling order
    pub student_ids: Vec<String>,
    /// Focus tags for this session, independent of the attendees' own goals
    pub goals: Vec<String>,
    pub session_type: SessionType,
    /// Per-attendee charge snapshotted from settings at creation time;
    /// absent on records that predate the field
    pub price_per_student: Option<i64>,
    pub status: SessionStatus,
    /// Pre-recorded paid amounts per attendee, consumed at completion
    pub balance_entries: HashMap<String, i64>,
    pub notes: String,
    /// Set once at creation, immutable thereafter
    pub created_at: DateTime<Utc>,
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Sessions deducted per attendee when completing a team session
    pub default_team_session_charge: i64,
    /// Sessions deducted per attendee when completing an individual session
    pub default_individual_session_charge: i64,
    /// Global vocabulary of goal tags offered when editing students and sessions
    pub available_goals: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_team_session_charge: 1,
            default_individual_session_charge: 2,
            available_goals: vec![
                "Flexibility".to_string(),
                "Strength".to_string(),
                "Balance".to_string(),
                "Breathing".to_string(),
                "Posture".to_string(),
                "Relaxation".to_string(),
            ],
        }
    }
}

impl AppSettings {
    /// Default per-attendee charge for the given session type.
    pub fn default_charge_for(&self, session_type: SessionType) -> i64 {
        match session_type {
            SessionType::Team => self.default_team_session_charge,
            SessionType::Individual => self.default_individual_session_charge,
        }
    }
}

/// A derived (never stored) view of a scheduled session whose end time has
/// passed, surfaced to prompt the instructor to complete it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    pub session_id: String,
    /// Computed from session type and attendee count
    pub display_name: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    /// Attendee names resolved against current students; unknown ids are filtered
    pub student_names: Vec<String>,
    /// Static instructional text for the tasks view
    pub summary: String,
}

/// Wholesale copy of the persisted collections, produced for backup and
/// accepted back as a full replacement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub students: Vec<Student>,
    pub sessions: Vec<Session>,
    pub settings: AppSettings,
}

/// Request for creating a new student
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateStudentRequest {
    pub name: String,
    pub phone: Option<String>,
    /// Starting balance; fractional input is rounded to a whole number
    pub balance: Option<f64>,
    pub goals: Vec<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub birthday: Option<NaiveDate>,
    pub member_since: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Request for updating an existing student. Fields left as None are unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Direct balance edit; bypasses the transaction ledger by design
    /// (out-of-band correction, not a ledger event)
    pub balance: Option<f64>,
    pub goals: Option<Vec<String>>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub birthday: Option<NaiveDate>,
    pub member_since: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Response after creating or updating a student
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentResponse {
    pub student: Student,
    pub success_message: String,
}

/// Response containing all students
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
}

/// Request for adding a note to a student
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddStudentNoteRequest {
    pub content: String,
}

/// Request for rewriting the content of an existing note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateStudentNoteRequest {
    pub content: String,
}

/// Response after a note operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentNoteResponse {
    pub note: StudentNote,
    pub success_message: String,
}

/// Request for recording a manual balance change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddBalanceTransactionRequest {
    pub student_id: String,
    /// Signed whole number of sessions
    pub change_amount: i64,
    pub reason: String,
    pub reason_en: Option<String>,
    pub reason_ru: Option<String>,
}

/// Response after recording a balance change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceTransactionResponse {
    pub transaction: BalanceTransaction,
    pub new_balance: i64,
    pub success_message: String,
}

/// Request for scheduling a new session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSessionRequest {
    pub date: NaiveDate,
    /// Must be one of the fixed 30-minute slots
    pub start_time: String,
    /// One of 60, 90 or 120; the end time is derived from this
    pub duration_minutes: u32,
    pub session_type: SessionType,
    pub student_ids: Vec<String>,
    pub goals: Vec<String>,
    pub notes: Option<String>,
}

/// Request for rescheduling or re-tagging a session. Fields left as None
/// are unchanged; status and creation time are never touched here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UpdateSessionRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub session_type: Option<SessionType>,
    pub student_ids: Option<Vec<String>>,
    pub goals: Option<Vec<String>>,
    pub notes: Option<String>,
    pub balance_entries: Option<HashMap<String, i64>>,
}

/// Request for completing a session with the attendees who actually came
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteSessionRequest {
    /// May differ from the scheduled list: absentees removed, walk-ins added
    pub confirmed_student_ids: Vec<String>,
}

/// Response after creating, updating, completing or cancelling a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionResponse {
    pub session: Session,
    pub success_message: String,
}

/// Response containing a list of sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
}

/// Errors from parsing an entity ID string
#[derive(Debug, Clone, PartialEq)]
pub enum IdError {
    InvalidFormat,
    InvalidType,
    InvalidTimestamp,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::InvalidFormat => write!(f, "Invalid ID format"),
            IdError::InvalidType => write!(f, "Invalid type segment in ID"),
            IdError::InvalidTimestamp => write!(f, "Invalid timestamp in ID"),
        }
    }
}

impl std::error::Error for IdError {}

fn parse_timestamped_id(id: &str, prefix: &str) -> Result<u64, IdError> {
    let parts: Vec<&str> = id.split("::").collect();
    if parts.len() != 2 || parts[0] != prefix {
        return Err(IdError::InvalidFormat);
    }
    parts[1].parse::<u64>().map_err(|_| IdError::InvalidTimestamp)
}

impl Student {
    /// Generate a student ID based on timestamp
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("student::{}", epoch_millis)
    }

    /// Parse a student ID to extract the timestamp
    pub fn parse_id(id: &str) -> Result<u64, IdError> {
        parse_timestamped_id(id, "student")
    }

    /// Age in whole years as of `today`, recomputed from the birthday on
    /// every call. Never stored: the birthday is the authoritative field.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birthday = self.birthday?;
        if birthday > today {
            return Some(0);
        }
        let mut age = today.year() - birthday.year();
        if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
            age -= 1;
        }
        Some(age.max(0) as u32)
    }
}

impl StudentNote {
    /// Generate a note ID based on timestamp
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("note::{}", epoch_millis)
    }

    /// Parse a note ID to extract the timestamp
    pub fn parse_id(id: &str) -> Result<u64, IdError> {
        parse_timestamped_id(id, "note")
    }
}

impl TransactionType {
    /// Derive the type from the sign of a change amount. Zero is a
    /// permitted degenerate case and classifies as Deducted.
    pub fn from_amount(change_amount: i64) -> Self {
        if change_amount > 0 {
            TransactionType::Added
        } else {
            TransactionType::Deducted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Added => "added",
            TransactionType::Deducted => "deducted",
        }
    }

    pub fn from_string(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "added" => Some(TransactionType::Added),
            "deducted" => Some(TransactionType::Deducted),
            _ => None,
        }
    }
}

impl BalanceTransaction {
    /// Generate a transaction ID from the change amount and timestamp
    pub fn generate_id(change_amount: i64, epoch_millis: u64) -> String {
        format!(
            "transaction::{}::{}",
            TransactionType::from_amount(change_amount).as_str(),
            epoch_millis
        )
    }

    /// Parse a transaction ID to extract its type segment and timestamp
    pub fn parse_id(id: &str) -> Result<(TransactionType, u64), IdError> {
        let parts: Vec<&str> = id.split("::").collect();
        if parts.len() != 3 || parts[0] != "transaction" {
            return Err(IdError::InvalidFormat);
        }
        let transaction_type =
            TransactionType::from_string(parts[1]).ok_or(IdError::InvalidType)?;
        let epoch_millis = parts[2]
            .parse::<u64>()
            .map_err(|_| IdError::InvalidTimestamp)?;
        Ok((transaction_type, epoch_millis))
    }
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Team => "team",
            SessionType::Individual => "individual",
        }
    }

    pub fn from_string(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "team" => Some(SessionType::Team),
            "individual" => Some(SessionType::Individual),
            _ => None,
        }
    }
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "scheduled" => Some(SessionStatus::Scheduled),
            "completed" => Some(SessionStatus::Completed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and Cancelled are terminal: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Scheduled)
    }
}

impl Session {
    /// Generate a session ID based on timestamp
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("session::{}", epoch_millis)
    }

    /// Parse a session ID to extract the timestamp
    pub fn parse_id(id: &str) -> Result<u64, IdError> {
        parse_timestamped_id(id, "session")
    }

    /// The moment this session ends: calendar day combined with the end
    /// time slot. None if the stored end time does not parse.
    pub fn end_datetime(&self) -> Option<NaiveDateTime> {
        let (hour, minute) = parse_slot(&self.end_time)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(self.date.and_time(time))
    }
}

/// Parse an "HH:MM" string into hour and minute components.
pub fn parse_slot(value: &str) -> Option<(u32, u32)> {
    let (hour_part, minute_part) = value.split_once(':')?;
    if hour_part.len() != 2 || minute_part.len() != 2 {
        return None;
    }
    let hour: u32 = hour_part.parse().ok()?;
    let minute: u32 = minute_part.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// The fixed grid of bookable time slots: every 30 minutes from 06:00
/// through 22:00 inclusive (33 slots).
pub fn time_slots() -> Vec<String> {
    let mut slots = Vec::new();
    let mut minutes = 6 * 60;
    while minutes <= 22 * 60 {
        slots.push(format!("{:02}:{:02}", minutes / 60, minutes % 60));
        minutes += 30;
    }
    slots
}

/// Whether the value lands exactly on the bookable slot grid.
pub fn is_valid_time_slot(value: &str) -> bool {
    match parse_slot(value) {
        Some((hour, minute)) => {
            let minutes = hour * 60 + minute;
            minutes >= 6 * 60 && minutes <= 22 * 60 && minutes % 30 == 0
        }
        None => false,
    }
}

/// Derive a session's end time from its start slot and duration.
///
/// Returns None when the start is not a valid slot, the duration is not
/// one of the allowed lengths, or the resulting end time would leave the
/// slot grid (sessions never run past 22:00 or span midnight).
pub fn derive_end_time(start_time: &str, duration_minutes: u32) -> Option<String> {
    if !is_valid_time_slot(start_time) {
        return None;
    }
    if !SESSION_DURATIONS_MINUTES.contains(&duration_minutes) {
        return None;
    }
    let (hour, minute) = parse_slot(start_time)?;
    let end_minutes = hour * 60 + minute + duration_minutes;
    let end = format!("{:02}:{:02}", end_minutes / 60, end_minutes % 60);
    if is_valid_time_slot(&end) {
        Some(end)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_parse_student_id() {
        let id = Student::generate_id(1702516122000);
        assert_eq!(id, "student::1702516122000");
        assert_eq!(Student::parse_id(&id).unwrap(), 1702516122000);

        assert!(Student::parse_id("student").is_err());
        assert!(Student::parse_id("session::123").is_err());
        assert!(Student::parse_id("student::not_a_number").is_err());
    }

    #[test]
    fn test_generate_transaction_id() {
        assert_eq!(
            BalanceTransaction::generate_id(3, 1702516122000),
            "transaction::added::1702516122000"
        );
        assert_eq!(
            BalanceTransaction::generate_id(-1, 1702516125000),
            "transaction::deducted::1702516125000"
        );
        // Zero classifies as deducted by the sign check
        assert_eq!(
            BalanceTransaction::generate_id(0, 1702516130000),
            "transaction::deducted::1702516130000"
        );
    }

    #[test]
    fn test_parse_transaction_id() {
        let (tx_type, ts) =
            BalanceTransaction::parse_id("transaction::added::1702516122000").unwrap();
        assert_eq!(tx_type, TransactionType::Added);
        assert_eq!(ts, 1702516122000);

        assert!(BalanceTransaction::parse_id("transaction::added").is_err());
        assert_eq!(
            BalanceTransaction::parse_id("transaction::income::123"),
            Err(IdError::InvalidType)
        );
        assert_eq!(
            BalanceTransaction::parse_id("transaction::added::abc"),
            Err(IdError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_transaction_type_from_amount() {
        assert_eq!(TransactionType::from_amount(5), TransactionType::Added);
        assert_eq!(TransactionType::from_amount(-5), TransactionType::Deducted);
        assert_eq!(TransactionType::from_amount(0), TransactionType::Deducted);
    }

    fn student_with_birthday(birthday: Option<NaiveDate>) -> Student {
        Student {
            id: Student::generate_id(1),
            name: "Test".to_string(),
            phone: None,
            balance: 0,
            goals: vec![],
            weight: None,
            height: None,
            birthday,
            member_since: None,
            description: None,
            notes: vec![],
            balance_transactions: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_on() {
        let student =
            student_with_birthday(Some(NaiveDate::from_ymd_opt(1990, 6, 15).unwrap()));

        // Day before the birthday
        assert_eq!(
            student.age_on(NaiveDate::from_ymd_opt(2026, 6, 14).unwrap()),
            Some(35)
        );
        // On the birthday
        assert_eq!(
            student.age_on(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()),
            Some(36)
        );
        // No birthday recorded
        assert_eq!(
            student_with_birthday(None).age_on(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()),
            None
        );
    }

    #[test]
    fn test_time_slot_grid() {
        let slots = time_slots();
        assert_eq!(slots.len(), 33);
        assert_eq!(slots.first().unwrap(), "06:00");
        assert_eq!(slots.last().unwrap(), "22:00");

        assert!(is_valid_time_slot("06:00"));
        assert!(is_valid_time_slot("13:30"));
        assert!(is_valid_time_slot("22:00"));
        assert!(!is_valid_time_slot("05:30"));
        assert!(!is_valid_time_slot("22:30"));
        assert!(!is_valid_time_slot("06:15"));
        assert!(!is_valid_time_slot("6:00"));
        assert!(!is_valid_time_slot("garbage"));
    }

    #[test]
    fn test_derive_end_time() {
        assert_eq!(derive_end_time("09:00", 60), Some("10:00".to_string()));
        assert_eq!(derive_end_time("06:00", 90), Some("07:30".to_string()));
        assert_eq!(derive_end_time("20:00", 120), Some("22:00".to_string()));

        // End time would run past the last slot
        assert_eq!(derive_end_time("21:30", 60), None);
        // Duration outside the allowed set
        assert_eq!(derive_end_time("09:00", 45), None);
        // Start off the grid
        assert_eq!(derive_end_time("09:15", 60), None);
    }

    #[test]
    fn test_session_end_datetime() {
        let session = Session {
            id: Session::generate_id(1),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            student_ids: vec![],
            goals: vec![],
            session_type: SessionType::Team,
            price_per_student: Some(1),
            status: SessionStatus::Scheduled,
            balance_entries: HashMap::new(),
            notes: String::new(),
            created_at: Utc::now(),
        };

        let end = session.end_datetime().unwrap();
        assert_eq!(end.to_string(), "2026-03-10 10:00:00");

        let mut malformed = session;
        malformed.end_time = "not-a-time".to_string();
        assert!(malformed.end_datetime().is_none());
    }

    #[test]
    fn test_session_status_terminal() {
        assert!(!SessionStatus::Scheduled.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.default_team_session_charge, 1);
        assert_eq!(settings.default_individual_session_charge, 2);
        assert!(!settings.available_goals.is_empty());
        assert_eq!(settings.default_charge_for(SessionType::Team), 1);
        assert_eq!(settings.default_charge_for(SessionType::Individual), 2);
    }
}
