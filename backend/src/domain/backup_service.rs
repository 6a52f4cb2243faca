//! Backup snapshot and restore.
//!
//! The core's whole contract with the external backup collaborator:
//! produce the current collections on demand, and accept a full
//! replacement set back. Restore overwrites; it never merges.

use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::domain::settings_service::SettingsService;
use crate::events::{AppEvent, EventBus, EventKind};
use crate::storage::{Connection, SessionStorage, SettingsStorage, StudentStorage};
use shared::BackupSnapshot;

/// Service exposing the wholesale snapshot/restore contract.
#[derive(Clone)]
pub struct BackupService<C: Connection> {
    student_repository: C::StudentRepository,
    session_repository: C::SessionRepository,
    settings_repository: C::SettingsRepository,
    settings_service: SettingsService<C>,
    events: EventBus,
}

impl<C: Connection> BackupService<C> {
    pub fn new(
        connection: Arc<C>,
        settings_service: SettingsService<C>,
        events: EventBus,
    ) -> Self {
        Self {
            student_repository: connection.create_student_repository(),
            session_repository: connection.create_session_repository(),
            settings_repository: connection.create_settings_repository(),
            settings_service,
            events,
        }
    }

    /// Produce the current collections wholesale.
    pub async fn snapshot(&self) -> Result<BackupSnapshot> {
        let students = self.student_repository.list_students().await?;
        let sessions = self.session_repository.list_sessions().await?;
        let settings = self.settings_service.get_settings().await?;

        info!(
            "Produced backup snapshot: {} students, {} sessions",
            students.len(),
            sessions.len()
        );
        Ok(BackupSnapshot {
            students,
            sessions,
            settings,
        })
    }

    /// Install a full replacement set. Existing collections are
    /// overwritten, not merged.
    pub async fn restore(&self, snapshot: BackupSnapshot) -> Result<()> {
        self.student_repository
            .replace_students(&snapshot.students)
            .await?;
        self.session_repository
            .replace_sessions(&snapshot.sessions)
            .await?;
        self.settings_repository
            .save_settings(&snapshot.settings)
            .await?;

        info!(
            "Restored backup: {} students, {} sessions",
            snapshot.students.len(),
            snapshot.sessions.len()
        );

        self.events
            .publish(AppEvent::new(EventKind::StudentUpdated));
        self.events
            .publish(AppEvent::new(EventKind::SessionChanged));
        self.events.publish(AppEvent::new(EventKind::TaskListUpdate));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonConnection;
    use chrono::{NaiveDate, Utc};
    use shared::{AppSettings, Session, SessionStatus, SessionType, Student};
    use tempfile::TempDir;

    fn setup_test() -> (BackupService<JsonConnection>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp_dir.path()).unwrap());
        let settings_service = SettingsService::new(Arc::clone(&connection));
        (
            BackupService::new(connection, settings_service, EventBus::new()),
            temp_dir,
        )
    }

    fn sample_student(name: &str) -> Student {
        Student {
            id: Student::generate_id(1),
            name: name.to_string(),
            phone: None,
            balance: 2,
            goals: vec![],
            weight: None,
            height: None,
            birthday: None,
            member_since: None,
            description: None,
            notes: vec![],
            balance_transactions: vec![],
            created_at: Utc::now(),
        }
    }

    fn sample_session() -> Session {
        Session {
            id: Session::generate_id(1),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            student_ids: vec!["student::1".to_string()],
            goals: vec![],
            session_type: SessionType::Team,
            price_per_student: Some(1),
            status: SessionStatus::Scheduled,
            balance_entries: Default::default(),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_contains_all_collections() {
        let (service, _temp) = setup_test();
        service
            .student_repository
            .store_student(&sample_student("Anna"))
            .await
            .unwrap();
        service
            .session_repository
            .store_session(&sample_session())
            .await
            .unwrap();

        let snapshot = service.snapshot().await.unwrap();
        assert_eq!(snapshot.students.len(), 1);
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.settings, AppSettings::default());
    }

    #[tokio::test]
    async fn test_restore_overwrites_existing_data() {
        let (service, _temp) = setup_test();
        service
            .student_repository
            .store_student(&sample_student("Old"))
            .await
            .unwrap();

        let replacement = BackupSnapshot {
            students: vec![sample_student("New")],
            sessions: vec![],
            settings: AppSettings {
                default_team_session_charge: 3,
                ..AppSettings::default()
            },
        };
        service.restore(replacement).await.unwrap();

        let students = service.student_repository.list_students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].name, "New");
        assert!(service
            .session_repository
            .list_sessions()
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            service
                .settings_service
                .get_settings()
                .await
                .unwrap()
                .default_team_session_charge,
            3
        );
    }

    #[tokio::test]
    async fn test_snapshot_restore_round_trip() {
        let (service, _temp) = setup_test();
        service
            .student_repository
            .store_student(&sample_student("Anna"))
            .await
            .unwrap();
        service
            .session_repository
            .store_session(&sample_session())
            .await
            .unwrap();

        let snapshot = service.snapshot().await.unwrap();
        service.restore(snapshot.clone()).await.unwrap();

        let after = service.snapshot().await.unwrap();
        assert_eq!(after, snapshot);
    }
}
