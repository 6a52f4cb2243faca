//! # Domain Module
//!
//! Contains all business logic for the yoga studio tracker.
//!
//! This module encapsulates the core business rules, entities, and services
//! that define how students, sessions and balances are modeled and managed.
//! It operates independently of any specific UI framework or storage
//! mechanism.
//!
//! ## Module Organization
//!
//! - **student_service**: Student CRUD and note management
//! - **balance_service**: The append-only balance ledger
//! - **session_service**: Session scheduling and the lifecycle state machine
//! - **task_service**: The derived "pending completion" task view
//! - **settings_service**: Application settings with default merging
//! - **backup_service**: Wholesale snapshot/restore for the backup collaborator
//!
//! ## Key Responsibilities
//!
//! - **Balance Integrity**: The cached balance always equals the
//!   chronological sum of the ledger when the ledger is the mutation path
//! - **Lifecycle Enforcement**: Completed and cancelled sessions are
//!   terminal; repeating a transition never moves a balance twice
//! - **Derived State**: Pending tasks are recomputed on demand, never stored
//! - **Change Notification**: Every mutation is announced on the event bus
//!   so views refresh without polling
//!
//! ## Design Principles
//!
//! - **Single Responsibility**: Each service has a focused purpose
//! - **Storage Agnostic**: Services work against the storage traits
//! - **Testability**: A caller-supplied clock where time matters

pub mod backup_service;
pub mod balance_service;
pub mod models;
pub mod session_service;
pub mod settings_service;
pub mod student_service;
pub mod task_service;

pub use backup_service::*;
pub use balance_service::*;
pub use session_service::*;
pub use settings_service::*;
pub use student_service::*;
pub use task_service::*;
