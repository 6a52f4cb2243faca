//! # JSON Student Repository
//!
//! Persists the student collection, including each student's notes and
//! balance ledger, in `students.json`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::connection::JsonConnection;
use super::parse_utc_datetime;
use crate::storage::StudentStorage;
use shared::{BalanceTransaction, Student, StudentNote, TransactionType};

/// Stored form of a note; string dates so legacy records can be repaired
/// at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoteRecord {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Stored form of a balance transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionRecord {
    id: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    transaction_type: String,
    #[serde(default)]
    change_amount: f64,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    reason_en: Option<String>,
    #[serde(default)]
    reason_ru: Option<String>,
    #[serde(default)]
    balance_after: f64,
}

/// Stored form of a student. Every field added after the first release
/// carries a default so old records read back cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StudentRecord {
    id: String,
    name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    balance: f64,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    birthday: Option<String>,
    #[serde(default)]
    member_since: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    notes: Vec<NoteRecord>,
    #[serde(default)]
    balance_transactions: Vec<TransactionRecord>,
    #[serde(default)]
    created_at: String,
}

impl From<&Student> for StudentRecord {
    fn from(student: &Student) -> Self {
        StudentRecord {
            id: student.id.clone(),
            name: student.name.clone(),
            phone: student.phone.clone(),
            balance: student.balance as f64,
            goals: student.goals.clone(),
            weight: student.weight,
            height: student.height,
            birthday: student.birthday.map(|d| d.to_string()),
            member_since: student.member_since.map(|d| d.to_string()),
            description: student.description.clone(),
            notes: student
                .notes
                .iter()
                .map(|note| NoteRecord {
                    id: note.id.clone(),
                    content: note.content.clone(),
                    timestamp: note.timestamp.to_rfc3339(),
                    updated_at: note.updated_at.map(|t| t.to_rfc3339()),
                })
                .collect(),
            balance_transactions: student
                .balance_transactions
                .iter()
                .map(|tx| TransactionRecord {
                    id: tx.id.clone(),
                    date: tx.date.to_rfc3339(),
                    transaction_type: tx.transaction_type.as_str().to_string(),
                    change_amount: tx.change_amount as f64,
                    reason: tx.reason.clone(),
                    reason_en: tx.reason_en.clone(),
                    reason_ru: tx.reason_ru.clone(),
                    balance_after: tx.balance_after as f64,
                })
                .collect(),
            created_at: student.created_at.to_rfc3339(),
        }
    }
}

impl StudentRecord {
    /// Convert back into the domain entity, repairing whatever a legacy or
    /// partially-written record is missing: bad timestamps become `now`,
    /// bad calendar dates are dropped, fractional amounts are rounded to
    /// whole sessions.
    fn into_student(self, now: DateTime<Utc>) -> Student {
        let created_at = parse_utc_datetime(&self.created_at).unwrap_or_else(|| {
            warn!(
                "Student {} has unparseable created_at '{}'; substituting current time",
                self.id, self.created_at
            );
            now
        });

        let notes = self
            .notes
            .into_iter()
            .map(|record| StudentNote {
                timestamp: parse_utc_datetime(&record.timestamp).unwrap_or(now),
                updated_at: record
                    .updated_at
                    .as_deref()
                    .and_then(parse_utc_datetime),
                id: record.id,
                content: record.content,
            })
            .collect();

        let balance_transactions = self
            .balance_transactions
            .into_iter()
            .map(|record| {
                let change_amount = record.change_amount.round() as i64;
                BalanceTransaction {
                    date: parse_utc_datetime(&record.date).unwrap_or(now),
                    transaction_type: TransactionType::from_string(&record.transaction_type)
                        .unwrap_or_else(|| TransactionType::from_amount(change_amount)),
                    change_amount,
                    balance_after: record.balance_after.round() as i64,
                    id: record.id,
                    reason: record.reason,
                    reason_en: record.reason_en,
                    reason_ru: record.reason_ru,
                }
            })
            .collect();

        Student {
            id: self.id,
            name: self.name,
            phone: self.phone,
            balance: self.balance.round() as i64,
            goals: self.goals,
            weight: self.weight,
            height: self.height,
            birthday: self.birthday.as_deref().and_then(parse_naive_date),
            member_since: self.member_since.as_deref().and_then(parse_naive_date),
            description: self.description,
            notes,
            balance_transactions,
            created_at,
        }
    }
}

fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    value.parse::<NaiveDate>().ok()
}

/// JSON-file-backed student repository
#[derive(Clone)]
pub struct StudentRepository {
    connection: JsonConnection,
}

impl StudentRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    /// Read the whole collection, repairing each record on the way in.
    fn read_students(&self) -> Result<Vec<Student>> {
        let path = self.connection.students_file_path();
        let raw: Vec<Value> = self
            .connection
            .read_json_file(&path)?
            .unwrap_or_default();

        let now = Utc::now();
        let mut students = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<StudentRecord>(value) {
                Ok(record) => students.push(record.into_student(now)),
                Err(e) => warn!("Skipping unreadable student record: {}", e),
            }
        }
        Ok(students)
    }

    /// Write the whole collection back out.
    fn write_students(&self, students: &[Student]) -> Result<()> {
        let records: Vec<StudentRecord> = students.iter().map(StudentRecord::from).collect();
        self.connection
            .write_json_file(&self.connection.students_file_path(), &records)
    }
}

#[async_trait]
impl StudentStorage for StudentRepository {
    async fn store_student(&self, student: &Student) -> Result<()> {
        let mut students = self.read_students()?;

        match students.iter_mut().find(|s| s.id == student.id) {
            Some(existing) => *existing = student.clone(),
            None => students.push(student.clone()),
        }

        self.write_students(&students)?;
        info!("Stored student: {}", student.id);
        Ok(())
    }

    async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let students = self.read_students()?;
        Ok(students.into_iter().find(|s| s.id == student_id))
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        self.read_students()
    }

    async fn delete_student(&self, student_id: &str) -> Result<bool> {
        let mut students = self.read_students()?;
        let initial_len = students.len();

        students.retain(|s| s.id != student_id);

        if students.len() < initial_len {
            self.write_students(&students)?;
            info!("Deleted student: {}", student_id);
            Ok(true)
        } else {
            warn!("Student not found for deletion: {}", student_id);
            Ok(false)
        }
    }

    async fn replace_students(&self, students: &[Student]) -> Result<()> {
        self.write_students(students)?;
        info!("Replaced student collection ({} records)", students.len());
        Ok(())
    }
}
