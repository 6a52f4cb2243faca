#[derive(Debug, thiserror::Error)]
pub enum SettingsValidationError {
    #[error("Default session charges must be positive")]
    NonPositiveCharge,
}
