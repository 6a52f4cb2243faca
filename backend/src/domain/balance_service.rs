//! Balance ledger logic for the yoga studio tracker.
//!
//! Every balance change flows through an append-only ledger on the
//! student record. The scalar `balance` field is a cached projection of
//! that ledger: it must always equal the chronological sum of the
//! `change_amount` values, and each entry snapshots the running sum in
//! `balance_after`. Corrections are made with new offsetting entries;
//! nothing ever edits or removes a past entry.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::events::{AppEvent, EventBus, EventKind};
use crate::storage::{Connection, StudentStorage};
use shared::{
    AddBalanceTransactionRequest, BalanceTransaction, BalanceTransactionResponse, Student,
    TransactionType,
};

/// Append one ledger entry to an in-memory student and update the cached
/// balance. The transaction type is derived from the sign of the amount
/// (zero classifies as deducted). Persisting the result is the caller's
/// job, which lets session completion compute every attendee's entry
/// before any write happens.
pub fn apply_transaction(
    student: &mut Student,
    change_amount: i64,
    reason: &str,
    reason_en: Option<String>,
    reason_ru: Option<String>,
    effective: DateTime<Utc>,
    epoch_millis: u64,
) -> BalanceTransaction {
    let new_balance = student.balance + change_amount;
    let transaction = BalanceTransaction {
        id: BalanceTransaction::generate_id(change_amount, epoch_millis),
        date: effective,
        transaction_type: TransactionType::from_amount(change_amount),
        change_amount,
        reason: reason.to_string(),
        reason_en,
        reason_ru,
        balance_after: new_balance,
    };
    student.balance_transactions.push(transaction.clone());
    student.balance = new_balance;
    transaction
}

/// Service responsible for recording balance changes and checking ledger
/// integrity.
#[derive(Clone)]
pub struct BalanceService<C: Connection> {
    student_repository: C::StudentRepository,
    events: EventBus,
}

impl<C: Connection> BalanceService<C> {
    pub fn new(connection: Arc<C>, events: EventBus) -> Self {
        let student_repository = connection.create_student_repository();
        Self {
            student_repository,
            events,
        }
    }

    /// Record a manual balance change for one student.
    pub async fn add_balance_transaction(
        &self,
        request: AddBalanceTransactionRequest,
    ) -> Result<BalanceTransactionResponse> {
        let mut student = self
            .student_repository
            .get_student(&request.student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", request.student_id))?;

        let now = Utc::now();
        let transaction = apply_transaction(
            &mut student,
            request.change_amount,
            &request.reason,
            request.reason_en,
            request.reason_ru,
            now,
            now.timestamp_millis() as u64,
        );

        self.student_repository.store_student(&student).await?;

        info!(
            "Recorded balance transaction {} for {}: {} sessions, balance now {}",
            transaction.id, student.id, transaction.change_amount, student.balance
        );

        self.events.publish(AppEvent::with_payload(
            EventKind::BalanceTransactionAdded,
            json!({
                "studentId": student.id,
                "transactionId": transaction.id,
                "newBalance": student.balance,
            }),
        ));

        Ok(BalanceTransactionResponse {
            transaction,
            new_balance: student.balance,
            success_message: "Balance transaction recorded successfully".to_string(),
        })
    }

    /// Validate that a student's ledger is internally consistent.
    ///
    /// Replays the ledger in stored (chronological) order and reports
    /// every entry whose `balance_after` snapshot drifts from the running
    /// sum, plus a final mismatch between the running sum and the cached
    /// scalar balance. Diagnostic only; nothing is mutated.
    pub async fn validate_ledger(&self, student_id: &str) -> Result<Vec<String>> {
        let student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;

        let mut errors = Vec::new();
        let mut running_balance = 0i64;

        for transaction in &student.balance_transactions {
            running_balance += transaction.change_amount;
            if transaction.balance_after != running_balance {
                let error = format!(
                    "Transaction {} has incorrect balance_after: expected {}, actual {}",
                    transaction.id, running_balance, transaction.balance_after
                );
                warn!("Ledger validation error for {}: {}", student_id, error);
                errors.push(error);
            }
        }

        if student.balance != running_balance {
            let error = format!(
                "Cached balance {} does not match ledger sum {}",
                student.balance, running_balance
            );
            warn!("Ledger validation error for {}: {}", student_id, error);
            errors.push(error);
        }

        if errors.is_empty() {
            info!("Ledger is consistent for student {}", student_id);
        }

        Ok(errors)
    }
}
