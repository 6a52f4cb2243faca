//! # JSON Session Repository
//!
//! Persists the session collection in `sessions.json`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::connection::JsonConnection;
use super::parse_utc_datetime;
use crate::storage::SessionStorage;
use shared::{Session, SessionStatus, SessionType};

/// Stored form of a session. Fields added after the first release carry
/// defaults so sessions created before those fields existed read back
/// cleanly: no `goals` becomes an empty list, no `session_type` becomes
/// team, no `status` becomes scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    id: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    end_time: String,
    #[serde(default)]
    student_ids: Vec<String>,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    session_type: String,
    #[serde(default)]
    price_per_student: Option<f64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    balance_entries: HashMap<String, Option<f64>>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    created_at: String,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        SessionRecord {
            id: session.id.clone(),
            date: session.date.to_string(),
            start_time: session.start_time.clone(),
            end_time: session.end_time.clone(),
            student_ids: session.student_ids.clone(),
            goals: session.goals.clone(),
            session_type: session.session_type.as_str().to_string(),
            price_per_student: session.price_per_student.map(|p| p as f64),
            status: session.status.as_str().to_string(),
            balance_entries: session
                .balance_entries
                .iter()
                .map(|(student_id, amount)| (student_id.clone(), Some(*amount as f64)))
                .collect(),
            notes: session.notes.clone(),
            created_at: session.created_at.to_rfc3339(),
        }
    }
}

impl SessionRecord {
    /// Convert back into the domain entity, repairing legacy records:
    /// an unparseable calendar day or creation timestamp is replaced with
    /// the current time rather than failing the read, and unset
    /// balance-entry values are dropped from the map.
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let date = self.date.parse::<NaiveDate>().unwrap_or_else(|_| {
            warn!(
                "Session {} has unparseable date '{}'; substituting today",
                self.id, self.date
            );
            now.date_naive()
        });

        let created_at = parse_utc_datetime(&self.created_at).unwrap_or_else(|| {
            warn!(
                "Session {} has unparseable created_at '{}'; substituting current time",
                self.id, self.created_at
            );
            now
        });

        let session_type = SessionType::from_string(&self.session_type).unwrap_or(SessionType::Team);
        let status = SessionStatus::from_string(&self.status).unwrap_or(SessionStatus::Scheduled);

        let balance_entries = self
            .balance_entries
            .into_iter()
            .filter_map(|(student_id, amount)| {
                amount.map(|a| (student_id, a.round() as i64))
            })
            .collect();

        Session {
            id: self.id,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            student_ids: self.student_ids,
            goals: self.goals,
            session_type,
            price_per_student: self.price_per_student.map(|p| p.round() as i64),
            status,
            balance_entries,
            notes: self.notes,
            created_at,
        }
    }
}

/// JSON-file-backed session repository
#[derive(Clone)]
pub struct SessionRepository {
    connection: JsonConnection,
}

impl SessionRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    fn read_sessions(&self) -> Result<Vec<Session>> {
        let path = self.connection.sessions_file_path();
        let raw: Vec<Value> = self
            .connection
            .read_json_file(&path)?
            .unwrap_or_default();

        let now = Utc::now();
        let mut sessions = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<SessionRecord>(value) {
                Ok(record) => sessions.push(record.into_session(now)),
                Err(e) => warn!("Skipping unreadable session record: {}", e),
            }
        }
        Ok(sessions)
    }

    fn write_sessions(&self, sessions: &[Session]) -> Result<()> {
        let records: Vec<SessionRecord> = sessions.iter().map(SessionRecord::from).collect();
        self.connection
            .write_json_file(&self.connection.sessions_file_path(), &records)
    }
}

#[async_trait]
impl SessionStorage for SessionRepository {
    async fn store_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.read_sessions()?;

        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }

        self.write_sessions(&sessions)?;
        info!("Stored session: {}", session.id);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self.read_sessions()?;
        Ok(sessions.into_iter().find(|s| s.id == session_id))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.read_sessions()
    }

    async fn list_sessions_for_student(&self, student_id: &str) -> Result<Vec<Session>> {
        let mut sessions = self.read_sessions()?;
        sessions.retain(|s| s.student_ids.iter().any(|id| id == student_id));
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.read_sessions()?;
        let initial_len = sessions.len();

        sessions.retain(|s| s.id != session_id);

        if sessions.len() < initial_len {
            self.write_sessions(&sessions)?;
            info!("Deleted session: {}", session_id);
            Ok(true)
        } else {
            warn!("Session not found for deletion: {}", session_id);
            Ok(false)
        }
    }

    async fn replace_sessions(&self, sessions: &[Session]) -> Result<()> {
        self.write_sessions(sessions)?;
        info!("Replaced session collection ({} records)", sessions.len());
        Ok(())
    }
}
