//! # JSON Settings Repository
//!
//! Persists the single settings record in `settings.json`. Missing keys
//! on an old record are merged with the hardcoded defaults during
//! deserialization, so schema evolution never surfaces as an absent value.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use super::connection::JsonConnection;
use crate::storage::SettingsStorage;
use shared::AppSettings;

fn default_team_charge() -> i64 {
    AppSettings::default().default_team_session_charge
}

fn default_individual_charge() -> i64 {
    AppSettings::default().default_individual_session_charge
}

fn default_goals() -> Vec<String> {
    AppSettings::default().available_goals
}

/// Stored form of the settings record; every field falls back to the
/// hardcoded default when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsRecord {
    #[serde(default = "default_team_charge")]
    default_team_session_charge: i64,
    #[serde(default = "default_individual_charge")]
    default_individual_session_charge: i64,
    #[serde(default = "default_goals")]
    available_goals: Vec<String>,
}

impl From<&AppSettings> for SettingsRecord {
    fn from(settings: &AppSettings) -> Self {
        SettingsRecord {
            default_team_session_charge: settings.default_team_session_charge,
            default_individual_session_charge: settings.default_individual_session_charge,
            available_goals: settings.available_goals.clone(),
        }
    }
}

impl From<SettingsRecord> for AppSettings {
    fn from(record: SettingsRecord) -> Self {
        AppSettings {
            default_team_session_charge: record.default_team_session_charge,
            default_individual_session_charge: record.default_individual_session_charge,
            available_goals: record.available_goals,
        }
    }
}

/// JSON-file-backed settings repository
#[derive(Clone)]
pub struct SettingsRepository {
    connection: JsonConnection,
}

impl SettingsRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SettingsStorage for SettingsRepository {
    async fn load_settings(&self) -> Result<Option<AppSettings>> {
        let record: Option<SettingsRecord> = self
            .connection
            .read_json_file(&self.connection.settings_file_path())?;
        Ok(record.map(AppSettings::from))
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        self.connection.write_json_file(
            &self.connection.settings_file_path(),
            &SettingsRecord::from(settings),
        )?;
        info!("Stored settings");
        Ok(())
    }
}
