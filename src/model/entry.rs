//! Configuration entry as delivered by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type tag of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigType {
    #[serde(alias = "string", alias = "STRING")]
    String,
    #[serde(alias = "int", alias = "INT")]
    Int,
    #[serde(alias = "double", alias = "DOUBLE")]
    Double,
    #[serde(alias = "bool", alias = "BOOL", alias = "Boolean")]
    Bool,
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::String => "String",
            ConfigType::Int => "Int",
            ConfigType::Double => "Double",
            ConfigType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

/// One configuration key's value for an application.
///
/// `raw_value` is the canonical string form; the typed view is produced by
/// [`crate::convert`] on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    /// Store-assigned identifier. Empty until inserted.
    #[serde(default)]
    pub id: String,
    /// Key, unique within the application's active set.
    #[serde(rename = "name")]
    pub key: String,
    #[serde(rename = "type")]
    pub declared_type: ConfigType,
    #[serde(rename = "value")]
    pub raw_value: String,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(rename = "applicationName")]
    pub application: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConfigEntry {
    /// Create an active entry with a fresh creation timestamp.
    pub fn new(
        application: impl Into<String>,
        key: impl Into<String>,
        declared_type: ConfigType,
        raw_value: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            key: key.into(),
            declared_type,
            raw_value: raw_value.into(),
            active: true,
            application: application.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Builder-style toggle of the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_names() {
        let json = r#"{
            "id": "42",
            "name": "MaxItemCount",
            "type": "Int",
            "value": "50",
            "isActive": true,
            "applicationName": "SERVICE-A",
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let entry: ConfigEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.key, "MaxItemCount");
        assert_eq!(entry.declared_type, ConfigType::Int);
        assert_eq!(entry.raw_value, "50");
        assert!(entry.active);
        assert_eq!(entry.application, "SERVICE-A");
        assert!(entry.updated_at.is_none());
    }

    #[test]
    fn test_type_aliases() {
        let t: ConfigType = serde_json::from_str("\"bool\"").unwrap();
        assert_eq!(t, ConfigType::Bool);
        let t: ConfigType = serde_json::from_str("\"Boolean\"").unwrap();
        assert_eq!(t, ConfigType::Bool);
        assert_eq!(ConfigType::Double.to_string(), "Double");
    }
}
