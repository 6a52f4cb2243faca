//! # JSON Connection
//!
//! Manages the data directory and the three well-known collection files:
//!
//! ```text
//! data/
//! ├── students.json    ← array of student records
//! ├── sessions.json    ← array of session records
//! └── settings.json    ← single settings record
//! ```
//!
//! Writes go through a temp-file-then-rename swap so a crash mid-write
//! never leaves a half-serialized collection behind.

use anyhow::Result;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::traits::Connection;

/// File-backed connection holding the base data directory.
#[derive(Clone)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Create a new connection rooted at the given directory, creating it
    /// if it does not exist yet.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self {
            base_directory: base_path,
        })
    }

    /// The directory all collection files live under.
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn students_file_path(&self) -> PathBuf {
        self.base_directory.join("students.json")
    }

    pub fn sessions_file_path(&self) -> PathBuf {
        self.base_directory.join("sessions.json")
    }

    pub fn settings_file_path(&self) -> PathBuf {
        self.base_directory.join("settings.json")
    }

    /// Read and deserialize one collection file.
    ///
    /// A missing or empty file reads as None. A file that no longer parses
    /// as JSON also reads as None, with a warning: the persisted bytes are
    /// left untouched until the next successful write, and refusing the
    /// whole read would take the rest of the data down with it.
    pub(crate) fn read_json_file<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&contents) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    "Could not parse {} ({}); treating the collection as empty",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Serialize and write one collection file atomically.
    pub(crate) fn write_json_file<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(value)?;

        // Atomic write pattern: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl Connection for JsonConnection {
    type StudentRepository = super::student_repository::StudentRepository;
    type SessionRepository = super::session_repository::SessionRepository;
    type SettingsRepository = super::settings_repository::SettingsRepository;

    fn create_student_repository(&self) -> Self::StudentRepository {
        super::student_repository::StudentRepository::new(self.clone())
    }

    fn create_session_repository(&self) -> Self::SessionRepository {
        super::session_repository::SessionRepository::new(self.clone())
    }

    fn create_settings_repository(&self) -> Self::SettingsRepository {
        super::settings_repository::SettingsRepository::new(self.clone())
    }
}
