//! Derived "pending completion" task view.
//!
//! There is no stored task entity. A task is any scheduled session whose
//! end time has passed, recomputed from the current session list and the
//! caller's wall clock on every query.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::{Connection, SessionStorage, StudentStorage};
use shared::{PendingTask, Session, SessionStatus, SessionType};

/// Instructional text shown with every pending task.
pub const TASK_SUMMARY: &str =
    "This session has ended. Confirm who attended and complete it to settle balances, or cancel it.";

/// True iff the session is still scheduled and `now` is strictly after
/// the moment its end slot passes. A malformed end time fails closed:
/// the session is never reported overdue.
pub fn is_session_overdue(session: &Session, now: NaiveDateTime) -> bool {
    if session.status != SessionStatus::Scheduled {
        return false;
    }
    match session.end_datetime() {
        Some(end) => now > end,
        None => false,
    }
}

/// Pure query service over sessions and students; holds no state of its own.
#[derive(Clone)]
pub struct TaskService<C: Connection> {
    session_repository: C::SessionRepository,
    student_repository: C::StudentRepository,
}

impl<C: Connection> TaskService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let session_repository = connection.create_session_repository();
        let student_repository = connection.create_student_repository();
        Self {
            session_repository,
            student_repository,
        }
    }

    /// All sessions pending completion as of `now`, oldest overdue first.
    pub async fn list_pending_tasks(&self, now: NaiveDateTime) -> Result<Vec<PendingTask>> {
        let sessions = self.session_repository.list_sessions().await?;
        let students = self.student_repository.list_students().await?;
        let names: HashMap<&str, &str> = students
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();

        let mut tasks: Vec<PendingTask> = sessions
            .iter()
            .filter(|session| is_session_overdue(session, now))
            .map(|session| PendingTask {
                session_id: session.id.clone(),
                display_name: display_name(session),
                date: session.date,
                start_time: session.start_time.clone(),
                end_time: session.end_time.clone(),
                student_names: session
                    .student_ids
                    .iter()
                    // Attendees deleted since scheduling are filtered out
                    .filter_map(|id| names.get(id.as_str()))
                    .map(|name| name.to_string())
                    .collect(),
                summary: TASK_SUMMARY.to_string(),
            })
            .collect();

        tasks.sort_by(|a, b| {
            (a.date, a.end_time.as_str(), a.session_id.as_str())
                .cmp(&(b.date, b.end_time.as_str(), b.session_id.as_str()))
        });
        Ok(tasks)
    }

    /// Number of sessions pending completion as of `now`. Drives the
    /// notification badge; always recomputed, never cached.
    pub async fn count_pending_tasks(&self, now: NaiveDateTime) -> Result<usize> {
        let sessions = self.session_repository.list_sessions().await?;
        Ok(sessions
            .iter()
            .filter(|session| is_session_overdue(session, now))
            .count())
    }

    /// Convenience wrapper over [`list_pending_tasks`] using the local
    /// wall clock.
    ///
    /// [`list_pending_tasks`]: Self::list_pending_tasks
    pub async fn list_pending_tasks_now(&self) -> Result<Vec<PendingTask>> {
        self.list_pending_tasks(Local::now().naive_local()).await
    }

    /// Convenience wrapper over [`count_pending_tasks`] using the local
    /// wall clock.
    ///
    /// [`count_pending_tasks`]: Self::count_pending_tasks
    pub async fn count_pending_tasks_now(&self) -> Result<usize> {
        self.count_pending_tasks(Local::now().naive_local()).await
    }
}

fn display_name(session: &Session) -> String {
    match session.session_type {
        SessionType::Individual => "Individual session".to_string(),
        SessionType::Team => match session.student_ids.len() {
            1 => "Team session (1 student)".to_string(),
            n => format!("Team session ({} students)", n),
        },
    }
}
