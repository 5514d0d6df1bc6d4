//! Settings loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::settings::schema::ReaderSettings;
use crate::settings::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate settings from TOML text.
pub fn parse_settings(content: &str) -> Result<ReaderSettings, SettingsError> {
    let settings: ReaderSettings = toml::from_str(content)?;
    validate_settings(&settings).map_err(SettingsError::Validation)?;
    Ok(settings)
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<ReaderSettings, SettingsError> {
    let content = fs::read_to_string(path)?;
    parse_settings(&content)
}
