//! Application settings domain logic.

use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::domain::models::SettingsValidationError;
use crate::storage::{Connection, SettingsStorage};
use shared::AppSettings;

/// Service for reading and updating the application-wide settings record.
#[derive(Clone)]
pub struct SettingsService<C: Connection> {
    settings_repository: C::SettingsRepository,
}

impl<C: Connection> SettingsService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let settings_repository = connection.create_settings_repository();
        Self {
            settings_repository,
        }
    }

    /// Current settings. On first run no record exists yet; the hardcoded
    /// defaults are written out and returned. Missing keys on an old
    /// record are already merged with defaults by the storage layer.
    pub async fn get_settings(&self) -> Result<AppSettings> {
        match self.settings_repository.load_settings().await? {
            Some(settings) => Ok(settings),
            None => {
                let defaults = AppSettings::default();
                info!("No settings record found; writing defaults");
                self.settings_repository.save_settings(&defaults).await?;
                Ok(defaults)
            }
        }
    }

    /// Replace the settings record. Charges must stay positive; the goal
    /// vocabulary may change freely and never retroactively alters tags
    /// already attached to students or sessions.
    pub async fn update_settings(&self, settings: AppSettings) -> Result<AppSettings> {
        if settings.default_team_session_charge <= 0
            || settings.default_individual_session_charge <= 0
        {
            return Err(SettingsValidationError::NonPositiveCharge.into());
        }

        self.settings_repository.save_settings(&settings).await?;
        info!(
            "Updated settings: team charge {}, individual charge {}, {} goals",
            settings.default_team_session_charge,
            settings.default_individual_session_charge,
            settings.available_goals.len()
        );
        Ok(settings)
    }
}
