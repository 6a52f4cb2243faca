//! Student management domain logic.

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::domain::models::StudentValidationError;
use crate::events::{AppEvent, EventBus, EventKind};
use crate::storage::{Connection, SessionStorage, StudentStorage};
use shared::{
    AddStudentNoteRequest, CreateStudentRequest, Student, StudentListResponse, StudentNote,
    StudentNoteResponse, StudentResponse, UpdateStudentRequest, UpdateStudentNoteRequest,
};

/// Service for managing students and their notes.
#[derive(Clone)]
pub struct StudentService<C: Connection> {
    student_repository: C::StudentRepository,
    session_repository: C::SessionRepository,
    events: EventBus,
}

impl<C: Connection> StudentService<C> {
    pub fn new(connection: Arc<C>, events: EventBus) -> Self {
        let student_repository = connection.create_student_repository();
        let session_repository = connection.create_session_repository();
        Self {
            student_repository,
            session_repository,
            events,
        }
    }

    /// Create a new student
    pub async fn create_student(&self, request: CreateStudentRequest) -> Result<StudentResponse> {
        let name = validate_name(&request.name)?;

        let now = Utc::now();
        let student = Student {
            id: Student::generate_id(now.timestamp_millis() as u64),
            name,
            phone: request.phone,
            // Fractional input is rounded; balances are whole sessions
            balance: request.balance.unwrap_or(0.0).round() as i64,
            goals: request.goals,
            weight: request.weight,
            height: request.height,
            birthday: request.birthday,
            member_since: request.member_since,
            description: request.description,
            notes: vec![],
            balance_transactions: vec![],
            created_at: now,
        };

        self.student_repository.store_student(&student).await?;
        info!("Created student: {} with ID: {}", student.name, student.id);

        self.publish_student_updated(&student.id);

        Ok(StudentResponse {
            student,
            success_message: "Student created successfully".to_string(),
        })
    }

    /// Get a student by ID
    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        self.student_repository.get_student(student_id).await
    }

    /// List all students
    pub async fn list_students(&self) -> Result<StudentListResponse> {
        let students = self.student_repository.list_students().await?;
        Ok(StudentListResponse { students })
    }

    /// Update an existing student. Fields left as None are unchanged.
    ///
    /// A balance value here is an out-of-band correction: it rewrites the
    /// cached balance without appending a ledger entry. Routine balance
    /// changes belong in the balance service instead.
    pub async fn update_student(
        &self,
        student_id: &str,
        request: UpdateStudentRequest,
    ) -> Result<StudentResponse> {
        let mut student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;

        if let Some(name) = request.name {
            student.name = validate_name(&name)?;
        }
        if let Some(phone) = request.phone {
            student.phone = Some(phone);
        }
        if let Some(balance) = request.balance {
            student.balance = balance.round() as i64;
        }
        if let Some(goals) = request.goals {
            student.goals = goals;
        }
        if let Some(weight) = request.weight {
            student.weight = Some(weight);
        }
        if let Some(height) = request.height {
            student.height = Some(height);
        }
        if let Some(birthday) = request.birthday {
            student.birthday = Some(birthday);
        }
        if let Some(member_since) = request.member_since {
            student.member_since = Some(member_since);
        }
        if let Some(description) = request.description {
            student.description = Some(description);
        }

        self.student_repository.store_student(&student).await?;
        info!("Updated student: {}", student.id);

        self.publish_student_updated(&student.id);

        Ok(StudentResponse {
            student,
            success_message: "Student updated successfully".to_string(),
        })
    }

    /// Delete a student and remove their id from every session's attendee
    /// list, so no session is left referencing a student that no longer
    /// exists. Deleting an unknown id is a silent no-op.
    pub async fn delete_student(&self, student_id: &str) -> Result<()> {
        if !self.student_repository.delete_student(student_id).await? {
            info!("Student not found for deletion: {}", student_id);
            return Ok(());
        }

        let sessions = self
            .session_repository
            .list_sessions_for_student(student_id)
            .await?;
        for mut session in sessions {
            session.student_ids.retain(|id| id != student_id);
            session.balance_entries.remove(student_id);
            self.session_repository.store_session(&session).await?;

            self.events.publish(AppEvent::with_payload(
                EventKind::SessionUpdated,
                json!({ "sessionId": session.id }),
            ));
            self.events.publish(AppEvent::with_payload(
                EventKind::SessionChanged,
                json!({ "sessionId": session.id }),
            ));
        }

        info!("Deleted student: {}", student_id);
        self.publish_student_updated(student_id);
        Ok(())
    }

    /// Add a note to a student
    pub async fn add_student_note(
        &self,
        student_id: &str,
        request: AddStudentNoteRequest,
    ) -> Result<StudentNoteResponse> {
        if request.content.trim().is_empty() {
            return Err(StudentValidationError::EmptyNoteContent.into());
        }

        let mut student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;

        let now = Utc::now();
        let note = StudentNote {
            id: StudentNote::generate_id(now.timestamp_millis() as u64),
            content: request.content,
            timestamp: now,
            updated_at: None,
        };
        student.notes.push(note.clone());

        self.student_repository.store_student(&student).await?;
        info!("Added note {} to student {}", note.id, student_id);

        self.events.publish(AppEvent::with_payload(
            EventKind::NoteAdded,
            json!({ "studentId": student_id, "noteId": note.id }),
        ));
        self.publish_student_updated(student_id);

        Ok(StudentNoteResponse {
            note,
            success_message: "Note added successfully".to_string(),
        })
    }

    /// Rewrite the content of an existing note, stamping its update time
    pub async fn update_student_note(
        &self,
        student_id: &str,
        note_id: &str,
        request: UpdateStudentNoteRequest,
    ) -> Result<StudentNoteResponse> {
        if request.content.trim().is_empty() {
            return Err(StudentValidationError::EmptyNoteContent.into());
        }

        let mut student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;

        let note = student
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| anyhow!("Note not found: {}", note_id))?;
        note.content = request.content;
        note.updated_at = Some(Utc::now());
        let updated = note.clone();

        self.student_repository.store_student(&student).await?;
        info!("Updated note {} on student {}", note_id, student_id);

        self.events.publish(AppEvent::with_payload(
            EventKind::NoteUpdated,
            json!({ "studentId": student_id, "noteId": note_id }),
        ));
        self.publish_student_updated(student_id);

        Ok(StudentNoteResponse {
            note: updated,
            success_message: "Note updated successfully".to_string(),
        })
    }

    /// Delete a note by id. An unknown student or note id is a silent no-op.
    pub async fn delete_student_note(&self, student_id: &str, note_id: &str) -> Result<()> {
        let mut student = match self.student_repository.get_student(student_id).await? {
            Some(student) => student,
            None => {
                info!("Student not found for note deletion: {}", student_id);
                return Ok(());
            }
        };

        let initial_len = student.notes.len();
        student.notes.retain(|n| n.id != note_id);
        if student.notes.len() == initial_len {
            warn!("Note not found for deletion: {}", note_id);
            return Ok(());
        }

        self.student_repository.store_student(&student).await?;
        info!("Deleted note {} from student {}", note_id, student_id);

        self.events.publish(AppEvent::with_payload(
            EventKind::NoteDeleted,
            json!({ "studentId": student_id, "noteId": note_id }),
        ));
        self.publish_student_updated(student_id);
        Ok(())
    }

    fn publish_student_updated(&self, student_id: &str) {
        self.events.publish(AppEvent::with_payload(
            EventKind::StudentUpdated,
            json!({ "studentId": student_id }),
        ));
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StudentValidationError::EmptyName.into());
    }
    if trimmed.len() > 100 {
        return Err(StudentValidationError::NameTooLong.into());
    }
    Ok(trimmed.to_string())
}
