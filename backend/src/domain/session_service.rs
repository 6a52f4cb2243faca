//! Session scheduling and lifecycle domain logic.
//!
//! A session starts out `Scheduled` and moves exactly once, to either
//! `Completed` or `Cancelled`. Both are terminal: there is no reopen.
//! Completion is the only path that touches balances, and every charge it
//! makes flows through the balance ledger so the history stays auditable.

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::domain::balance_service::apply_transaction;
use crate::domain::models::SessionValidationError;
use crate::domain::settings_service::SettingsService;
use crate::events::{AppEvent, EventBus, EventKind};
use crate::storage::{Connection, SessionStorage, StudentStorage};
use shared::{
    derive_end_time, is_valid_time_slot, parse_slot, CompleteSessionRequest, CreateSessionRequest,
    Session, SessionListResponse, SessionResponse, SessionStatus, UpdateSessionRequest,
    SESSION_DURATIONS_MINUTES,
};

/// Service for scheduling sessions and driving their lifecycle.
#[derive(Clone)]
pub struct SessionService<C: Connection> {
    session_repository: C::SessionRepository,
    student_repository: C::StudentRepository,
    settings_service: SettingsService<C>,
    events: EventBus,
}

impl<C: Connection> SessionService<C> {
    pub fn new(
        connection: Arc<C>,
        settings_service: SettingsService<C>,
        events: EventBus,
    ) -> Self {
        let session_repository = connection.create_session_repository();
        let student_repository = connection.create_student_repository();
        Self {
            session_repository,
            student_repository,
            settings_service,
            events,
        }
    }

    /// Schedule a new session.
    ///
    /// The end time is always derived from the start slot and duration,
    /// and the per-attendee charge is snapshotted from the current
    /// settings so later settings changes do not reprice this session.
    pub async fn create_session(&self, request: CreateSessionRequest) -> Result<SessionResponse> {
        if request.student_ids.is_empty() {
            return Err(SessionValidationError::NoAttendees.into());
        }
        let end_time = validate_time_range(&request.start_time, request.duration_minutes)?;

        let settings = self.settings_service.get_settings().await?;
        let price_per_student = settings.default_charge_for(request.session_type);

        let now = Utc::now();
        let session = Session {
            id: Session::generate_id(now.timestamp_millis() as u64),
            date: request.date,
            start_time: request.start_time,
            end_time,
            student_ids: request.student_ids,
            goals: request.goals,
            session_type: request.session_type,
            price_per_student: Some(price_per_student),
            status: SessionStatus::Scheduled,
            balance_entries: Default::default(),
            notes: request.notes.unwrap_or_default(),
            created_at: now,
        };

        self.session_repository.store_session(&session).await?;
        info!(
            "Scheduled {} session {} on {} {}-{} for {} students",
            session.session_type.as_str(),
            session.id,
            session.date,
            session.start_time,
            session.end_time,
            session.student_ids.len()
        );

        self.publish(EventKind::SessionCreated, &session.id);
        self.publish(EventKind::SessionChanged, &session.id);
        self.events.publish(AppEvent::new(EventKind::TaskListUpdate));

        Ok(SessionResponse {
            session,
            success_message: "Session scheduled successfully".to_string(),
        })
    }

    /// Get a session by ID
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.session_repository.get_session(session_id).await
    }

    /// List all sessions
    pub async fn list_sessions(&self) -> Result<SessionListResponse> {
        let sessions = self.session_repository.list_sessions().await?;
        Ok(SessionListResponse { sessions })
    }

    /// List all sessions a student is scheduled into
    pub async fn get_sessions_for_student(&self, student_id: &str) -> Result<SessionListResponse> {
        let sessions = self
            .session_repository
            .list_sessions_for_student(student_id)
            .await?;
        Ok(SessionListResponse { sessions })
    }

    /// Reschedule or re-tag an existing session. Fields left as None are
    /// unchanged; the status and creation time are never touched here.
    pub async fn update_session(
        &self,
        session_id: &str,
        request: UpdateSessionRequest,
    ) -> Result<SessionResponse> {
        let mut session = self
            .session_repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| anyhow!("Session not found: {}", session_id))?;

        if let Some(date) = request.date {
            session.date = date;
        }
        if request.start_time.is_some() || request.duration_minutes.is_some() {
            let start_time = request
                .start_time
                .unwrap_or_else(|| session.start_time.clone());
            let duration = match request.duration_minutes {
                Some(duration) => duration,
                None => session_duration_minutes(&session)
                    .unwrap_or(SESSION_DURATIONS_MINUTES[0]),
            };
            session.end_time = validate_time_range(&start_time, duration)?;
            session.start_time = start_time;
        }
        if let Some(session_type) = request.session_type {
            session.session_type = session_type;
        }
        if let Some(student_ids) = request.student_ids {
            if student_ids.is_empty() {
                return Err(SessionValidationError::NoAttendees.into());
            }
            session.student_ids = student_ids;
        }
        if let Some(goals) = request.goals {
            session.goals = goals;
        }
        if let Some(notes) = request.notes {
            session.notes = notes;
        }
        if let Some(balance_entries) = request.balance_entries {
            session.balance_entries = balance_entries;
        }

        self.session_repository.store_session(&session).await?;
        info!("Updated session: {}", session.id);

        self.publish(EventKind::SessionUpdated, &session.id);
        self.publish(EventKind::SessionChanged, &session.id);
        self.events.publish(AppEvent::new(EventKind::TaskListUpdate));

        Ok(SessionResponse {
            session,
            success_message: "Session updated successfully".to_string(),
        })
    }

    /// Delete a session. An unknown id is a silent no-op.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        if !self.session_repository.delete_session(session_id).await? {
            info!("Session not found for deletion: {}", session_id);
            return Ok(());
        }

        self.publish(EventKind::SessionDeleted, session_id);
        self.publish(EventKind::SessionChanged, session_id);
        self.events.publish(AppEvent::new(EventKind::TaskListUpdate));
        Ok(())
    }

    /// Complete a scheduled session with the attendees who actually came.
    ///
    /// The confirmed list may differ from the scheduled one: absentees
    /// dropped, walk-ins added. Each confirmed attendee is charged the
    /// session's snapshotted per-student price (current settings default
    /// for records predating the snapshot field) through the balance
    /// ledger; a pre-recorded paid amount offsets the charge. Every
    /// ledger entry is computed before the first write, so a failure
    /// cannot leave half the attendees charged with no record of which
    /// half.
    ///
    /// Completing a session that is not `Scheduled` is a no-op: the
    /// session is returned unchanged and no balance moves.
    pub async fn complete_session(
        &self,
        session_id: &str,
        request: CompleteSessionRequest,
    ) -> Result<SessionResponse> {
        let mut session = self
            .session_repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| anyhow!("Session not found: {}", session_id))?;

        if session.status != SessionStatus::Scheduled {
            info!(
                "Session {} is already {}; complete is a no-op",
                session.id,
                session.status.as_str()
            );
            return Ok(SessionResponse {
                success_message: format!(
                    "Session is already {}; no changes applied",
                    session.status.as_str()
                ),
                session,
            });
        }

        let charge = match session.price_per_student {
            Some(price) => price,
            None => {
                // Sessions stored before prices were snapshotted fall back
                // to the current settings default
                let settings = self.settings_service.get_settings().await?;
                settings.default_charge_for(session.session_type)
            }
        };

        let now = Utc::now();
        let now_millis = now.timestamp_millis() as u64;
        let reason = format!(
            "Session on {} {}-{} ({})",
            session.date,
            session.start_time,
            session.end_time,
            session.session_type.as_str()
        );

        // Compute every attendee's ledger entry in memory first; nothing
        // is written until all of them are known good.
        let mut settled = Vec::new();
        for (index, student_id) in request.confirmed_student_ids.iter().enumerate() {
            match self.student_repository.get_student(student_id).await? {
                Some(mut student) => {
                    let change_amount = match session.balance_entries.get(student_id) {
                        Some(paid) => paid - charge,
                        None => -charge,
                    };
                    let transaction = apply_transaction(
                        &mut student,
                        change_amount,
                        &reason,
                        None,
                        None,
                        now,
                        now_millis + index as u64,
                    );
                    settled.push((student, transaction));
                }
                None => {
                    warn!(
                        "Confirmed attendee {} does not exist; skipping their charge",
                        student_id
                    );
                }
            }
        }

        let attendee_count = settled.len();
        for (student, transaction) in &settled {
            self.student_repository.store_student(student).await?;
            self.events.publish(AppEvent::with_payload(
                EventKind::BalanceTransactionAdded,
                json!({
                    "studentId": student.id,
                    "transactionId": transaction.id,
                    "newBalance": student.balance,
                }),
            ));
        }

        // The attendee list is rewritten to record who actually attended
        session.student_ids = request.confirmed_student_ids;
        session.status = SessionStatus::Completed;
        self.session_repository.store_session(&session).await?;
        info!(
            "Completed session {}: charged {} of {} confirmed attendees {} session(s) each",
            session.id,
            attendee_count,
            session.student_ids.len(),
            charge
        );

        self.publish(EventKind::SessionUpdated, &session.id);
        self.publish(EventKind::SessionCompleted, &session.id);
        self.publish(EventKind::SessionChanged, &session.id);
        self.events.publish(AppEvent::new(EventKind::TaskListUpdate));

        Ok(SessionResponse {
            session,
            success_message: "Session completed successfully".to_string(),
        })
    }

    /// Cancel a scheduled session. Cancellation never touches balances.
    ///
    /// Cancelling a session that is not `Scheduled` is a no-op: the
    /// session is returned unchanged.
    pub async fn cancel_session(&self, session_id: &str) -> Result<SessionResponse> {
        let mut session = self
            .session_repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| anyhow!("Session not found: {}", session_id))?;

        if session.status != SessionStatus::Scheduled {
            info!(
                "Session {} is already {}; cancel is a no-op",
                session.id,
                session.status.as_str()
            );
            return Ok(SessionResponse {
                success_message: format!(
                    "Session is already {}; no changes applied",
                    session.status.as_str()
                ),
                session,
            });
        }

        session.status = SessionStatus::Cancelled;
        self.session_repository.store_session(&session).await?;
        info!("Cancelled session: {}", session.id);

        self.publish(EventKind::SessionCancelled, &session.id);
        self.publish(EventKind::SessionChanged, &session.id);
        self.events.publish(AppEvent::new(EventKind::TaskListUpdate));

        Ok(SessionResponse {
            session,
            success_message: "Session cancelled successfully".to_string(),
        })
    }

    fn publish(&self, kind: EventKind, session_id: &str) {
        self.events.publish(AppEvent::with_payload(
            kind,
            json!({ "sessionId": session_id }),
        ));
    }
}

/// Validate the start slot and duration, returning the derived end time.
fn validate_time_range(start_time: &str, duration_minutes: u32) -> Result<String> {
    if !is_valid_time_slot(start_time) {
        return Err(SessionValidationError::InvalidStartTime(start_time.to_string()).into());
    }
    if !SESSION_DURATIONS_MINUTES.contains(&duration_minutes) {
        return Err(SessionValidationError::InvalidDuration(duration_minutes).into());
    }
    derive_end_time(start_time, duration_minutes).ok_or_else(|| {
        SessionValidationError::EndTimeOutOfRange(start_time.to_string(), duration_minutes).into()
    })
}

/// Recover a session's duration from its stored time range.
fn session_duration_minutes(session: &Session) -> Option<u32> {
    let (start_hour, start_minute) = parse_slot(&session.start_time)?;
    let (end_hour, end_minute) = parse_slot(&session.end_time)?;
    (end_hour * 60 + end_minute).checked_sub(start_hour * 60 + start_minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::student_service::StudentService;
    use crate::storage::JsonConnection;
    use chrono::NaiveDate;
    use shared::{CreateStudentRequest, SessionType, Student, TransactionType};
    use tempfile::TempDir;

    struct TestContext {
        session_service: SessionService<JsonConnection>,
        student_service: StudentService<JsonConnection>,
        settings_service: SettingsService<JsonConnection>,
        events: EventBus,
        _temp: TempDir,
    }

    fn setup_test() -> TestContext {
        let temp = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp.path()).unwrap());
        let events = EventBus::new();
        let settings_service = SettingsService::new(Arc::clone(&connection));
        TestContext {
            session_service: SessionService::new(
                Arc::clone(&connection),
                settings_service.clone(),
                events.clone(),
            ),
            student_service: StudentService::new(Arc::clone(&connection), events.clone()),
            settings_service,
            events,
            _temp: temp,
        }
    }

    async fn create_student(ctx: &TestContext, name: &str) -> Student {
        // Small delay so time-based ids stay unique
        tokio::time::sleep(tokio::time::Duration::from_millis(2)).await;
        ctx.student_service
            .create_student(CreateStudentRequest {
                name: name.to_string(),
                phone: None,
                balance: None,
                goals: vec![],
                weight: None,
                height: None,
                birthday: None,
                member_since: None,
                description: None,
            })
            .await
            .unwrap()
            .student
    }

    fn session_request(student_ids: Vec<String>) -> CreateSessionRequest {
        CreateSessionRequest {
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            start_time: "09:00".to_string(),
            duration_minutes: 60,
            session_type: SessionType::Team,
            student_ids,
            goals: vec![],
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_session_derives_end_time_and_snapshots_price() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let response = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap();

        let session = response.session;
        assert_eq!(session.end_time, "10:00");
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.price_per_student, Some(1));
    }

    #[tokio::test]
    async fn test_create_session_validation() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let mut no_attendees = session_request(vec![]);
        no_attendees.student_ids = vec![];
        assert!(ctx
            .session_service
            .create_session(no_attendees)
            .await
            .is_err());

        let mut off_grid = session_request(vec![anna.id.clone()]);
        off_grid.start_time = "09:15".to_string();
        assert!(ctx.session_service.create_session(off_grid).await.is_err());

        let mut bad_duration = session_request(vec![anna.id.clone()]);
        bad_duration.duration_minutes = 45;
        assert!(ctx
            .session_service
            .create_session(bad_duration)
            .await
            .is_err());

        let mut past_last_slot = session_request(vec![anna.id.clone()]);
        past_last_slot.start_time = "21:30".to_string();
        past_last_slot.duration_minutes = 60;
        assert!(ctx
            .session_service
            .create_session(past_last_slot)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_completion_charges_each_confirmed_attendee_once() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;
        let boris = create_student(&ctx, "Boris").await;
        let vera = create_student(&ctx, "Vera").await;
        let ids = vec![anna.id.clone(), boris.id.clone(), vera.id.clone()];

        let session = ctx
            .session_service
            .create_session(session_request(ids.clone()))
            .await
            .unwrap()
            .session;

        ctx.session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: ids.clone(),
                },
            )
            .await
            .unwrap();

        for id in &ids {
            let student = ctx.student_service.get_student(id).await.unwrap().unwrap();
            assert_eq!(student.balance, -1);
            assert_eq!(student.balance_transactions.len(), 1);
            let tx = &student.balance_transactions[0];
            assert_eq!(tx.change_amount, -1);
            assert_eq!(tx.transaction_type, TransactionType::Deducted);
            assert_eq!(tx.balance_after, -1);
        }
    }

    #[tokio::test]
    async fn test_completion_rewrites_attendees_to_confirmed_list() {
        // End-to-end: schedule with A and B, complete with only A
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;
        let boris = create_student(&ctx, "Boris").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone(), boris.id.clone()]))
            .await
            .unwrap()
            .session;

        let response = ctx
            .session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: vec![anna.id.clone()],
                },
            )
            .await
            .unwrap();

        assert_eq!(response.session.status, SessionStatus::Completed);
        assert_eq!(response.session.student_ids, vec![anna.id.clone()]);

        let anna_stored = ctx
            .student_service
            .get_student(&anna.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(anna_stored.balance, -1);
        assert_eq!(anna_stored.balance_transactions.len(), 1);
        assert_eq!(anna_stored.balance_transactions[0].balance_after, -1);

        let boris_stored = ctx
            .student_service
            .get_student(&boris.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(boris_stored.balance, 0);
        assert!(boris_stored.balance_transactions.is_empty());
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;

        let request = CompleteSessionRequest {
            confirmed_student_ids: vec![anna.id.clone()],
        };
        ctx.session_service
            .complete_session(&session.id, request.clone())
            .await
            .unwrap();
        // Second completion must not charge anyone again
        let second = ctx
            .session_service
            .complete_session(&session.id, request)
            .await
            .unwrap();
        assert_eq!(second.session.status, SessionStatus::Completed);

        let student = ctx
            .student_service
            .get_student(&anna.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(student.balance, -1);
        assert_eq!(student.balance_transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_honours_price_snapshot_over_later_settings() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;
        assert_eq!(session.price_per_student, Some(1));

        // Raise the team charge after the session was scheduled
        let mut settings = ctx.settings_service.get_settings().await.unwrap();
        settings.default_team_session_charge = 5;
        ctx.settings_service
            .update_settings(settings)
            .await
            .unwrap();

        ctx.session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: vec![anna.id.clone()],
                },
            )
            .await
            .unwrap();

        let student = ctx
            .student_service
            .get_student(&anna.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(student.balance, -1);
    }

    #[tokio::test]
    async fn test_completion_offsets_prerecorded_paid_amounts() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;
        ctx.session_service
            .update_session(
                &session.id,
                UpdateSessionRequest {
                    balance_entries: Some([(anna.id.clone(), 1)].into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        ctx.session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: vec![anna.id.clone()],
                },
            )
            .await
            .unwrap();

        // Paid amount covered the charge: net zero, but still on the ledger
        let student = ctx
            .student_service
            .get_student(&anna.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(student.balance, 0);
        assert_eq!(student.balance_transactions.len(), 1);
        assert_eq!(student.balance_transactions[0].change_amount, 0);
    }

    #[tokio::test]
    async fn test_completion_skips_unknown_attendees() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;

        let response = ctx
            .session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: vec![anna.id.clone(), "student::ghost".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(response.session.status, SessionStatus::Completed);
        let student = ctx
            .student_service
            .get_student(&anna.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(student.balance, -1);
    }

    #[tokio::test]
    async fn test_cancellation_is_balance_neutral_and_idempotent() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;
        let boris = create_student(&ctx, "Boris").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone(), boris.id.clone()]))
            .await
            .unwrap()
            .session;

        let cancelled = ctx
            .session_service
            .cancel_session(&session.id)
            .await
            .unwrap();
        assert_eq!(cancelled.session.status, SessionStatus::Cancelled);

        for id in [&anna.id, &boris.id] {
            let student = ctx.student_service.get_student(id).await.unwrap().unwrap();
            assert_eq!(student.balance, 0);
            assert!(student.balance_transactions.is_empty());
        }

        // Cancelling again, or completing a cancelled session, changes nothing
        let again = ctx
            .session_service
            .cancel_session(&session.id)
            .await
            .unwrap();
        assert_eq!(again.session.status, SessionStatus::Cancelled);

        let completed = ctx
            .session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: vec![anna.id.clone()],
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.session.status, SessionStatus::Cancelled);
        let student = ctx
            .student_service
            .get_student(&anna.id)
            .await
            .unwrap()
            .unwrap();
        assert!(student.balance_transactions.is_empty());
    }

    #[tokio::test]
    async fn test_update_session_reschedules_without_touching_status() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;

        let updated = ctx
            .session_service
            .update_session(
                &session.id,
                UpdateSessionRequest {
                    start_time: Some("18:00".to_string()),
                    duration_minutes: Some(90),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .session;

        assert_eq!(updated.start_time, "18:00");
        assert_eq!(updated.end_time, "19:30");
        assert_eq!(updated.status, SessionStatus::Scheduled);
        assert_eq!(updated.created_at, session.created_at);
    }

    #[tokio::test]
    async fn test_update_keeps_duration_when_only_start_moves() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(CreateSessionRequest {
                duration_minutes: 90,
                ..session_request(vec![anna.id.clone()])
            })
            .await
            .unwrap()
            .session;
        assert_eq!(session.end_time, "10:30");

        let updated = ctx
            .session_service
            .update_session(
                &session.id,
                UpdateSessionRequest {
                    start_time: Some("10:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .session;
        assert_eq!(updated.end_time, "11:30");
    }

    #[tokio::test]
    async fn test_delete_session_publishes_and_tolerates_unknown_id() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;

        let deleted = Arc::new(std::sync::Mutex::new(0u32));
        let sink = Arc::clone(&deleted);
        let _sub = ctx.events.subscribe(EventKind::SessionDeleted, move |_| {
            *sink.lock().unwrap() += 1;
        });

        ctx.session_service.delete_session(&session.id).await.unwrap();
        assert_eq!(*deleted.lock().unwrap(), 1);

        // Unknown id: silent no-op, no event
        ctx.session_service.delete_session(&session.id).await.unwrap();
        assert_eq!(*deleted.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_completion_publishes_the_full_event_set() {
        let ctx = setup_test();
        let anna = create_student(&ctx, "Anna").await;

        let session = ctx
            .session_service
            .create_session(session_request(vec![anna.id.clone()]))
            .await
            .unwrap()
            .session;

        let kinds = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut subscriptions = Vec::new();
        for kind in [
            EventKind::SessionUpdated,
            EventKind::SessionCompleted,
            EventKind::SessionChanged,
            EventKind::TaskListUpdate,
            EventKind::BalanceTransactionAdded,
        ] {
            let sink = Arc::clone(&kinds);
            subscriptions.push(ctx.events.subscribe(kind, move |event| {
                sink.lock().unwrap().push(event.kind);
            }));
        }

        ctx.session_service
            .complete_session(
                &session.id,
                CompleteSessionRequest {
                    confirmed_student_ids: vec![anna.id.clone()],
                },
            )
            .await
            .unwrap();

        let seen = kinds.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                EventKind::BalanceTransactionAdded,
                EventKind::SessionUpdated,
                EventKind::SessionCompleted,
                EventKind::SessionChanged,
                EventKind::TaskListUpdate,
            ]
        );
    }
}
