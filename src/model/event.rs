//! Change events carried by the push feed, and their topic routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::model::entry::{ConfigEntry, ConfigType};

/// Kind of mutation that produced an event. Numeric on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ChangeKind {
    Created = 1,
    Updated = 2,
    Deleted = 3,
    StatusChanged = 4,
}

impl ChangeKind {
    /// Lowercase word used as the last topic segment.
    pub fn topic_word(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
            ChangeKind::StatusChanged => "statuschanged",
        }
    }
}

impl TryFrom<u8> for ChangeKind {
    type Error = String;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            1 => Ok(ChangeKind::Created),
            2 => Ok(ChangeKind::Updated),
            3 => Ok(ChangeKind::Deleted),
            4 => Ok(ChangeKind::StatusChanged),
            other => Err(format!("unknown change type {}", other)),
        }
    }
}

impl From<ChangeKind> for u8 {
    fn from(kind: ChangeKind) -> Self {
        kind as u8
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_word())
    }
}

/// A change notification for one configuration key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub change_type: ChangeKind,
    pub application_name: String,
    pub configuration_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_type: Option<ConfigType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl ChangeEvent {
    /// Build an event describing `entry` after a store write.
    pub fn for_entry(kind: ChangeKind, entry: &ConfigEntry) -> Self {
        Self {
            change_type: kind,
            application_name: entry.application.clone(),
            configuration_name: entry.key.clone(),
            configuration_value: Some(entry.raw_value.clone()),
            configuration_type: Some(entry.declared_type),
            is_active: Some(entry.active),
            timestamp: Utc::now(),
            configuration_id: (!entry.id.is_empty()).then(|| entry.id.clone()),
            metadata: None,
        }
    }

    /// Topic this event is published under: `<namespace>.<application>.<kind>`.
    pub fn routing_key(&self, namespace: &str) -> String {
        format!(
            "{}.{}.{}",
            namespace,
            self.application_name,
            self.change_type.topic_word()
        )
    }
}

/// Pattern a listener binds to receive every change kind for one application.
pub fn binding_pattern(namespace: &str, application: &str) -> String {
    format!("{}.{}.*", namespace, application)
}

/// Topic matching with dot-separated words: `*` matches exactly one word,
/// `#` matches zero or more.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let topic: Vec<&str> = topic.split('.').collect();
    match_words(&pattern, &topic)
}

fn match_words(pattern: &[&str], topic: &[&str]) -> bool {
    match pattern.split_first() {
        None => topic.is_empty(),
        Some((&"#", rest)) => (0..=topic.len()).any(|skip| match_words(rest, &topic[skip..])),
        Some((&"*", rest)) => !topic.is_empty() && match_words(rest, &topic[1..]),
        Some((word, rest)) => {
            topic.first().is_some_and(|t| t == word) && match_words(rest, &topic[1..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_wire_value() {
        let json = r#"{
            "changeType": 3,
            "applicationName": "SERVICE-A",
            "configurationName": "SiteName",
            "timestamp": "2024-05-01T10:00:00Z"
        }"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.change_type, ChangeKind::Deleted);
        assert!(event.configuration_value.is_none());

        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["changeType"], 3);
    }

    #[test]
    fn test_unknown_change_kind_rejected() {
        let json = r#"{
            "changeType": 9,
            "applicationName": "SERVICE-A",
            "configurationName": "SiteName",
            "timestamp": "2024-05-01T10:00:00Z"
        }"#;
        assert!(serde_json::from_str::<ChangeEvent>(json).is_err());
    }

    #[test]
    fn test_routing_key() {
        let entry = ConfigEntry::new("SERVICE-A", "SiteName", ConfigType::String, "soty.io");
        let event = ChangeEvent::for_entry(ChangeKind::StatusChanged, &entry);
        assert_eq!(
            event.routing_key("configuration"),
            "configuration.SERVICE-A.statuschanged"
        );
        assert!(event.configuration_id.is_none());
    }

    #[test]
    fn test_topic_matching() {
        let pattern = binding_pattern("configuration", "SERVICE-A");
        assert!(topic_matches(&pattern, "configuration.SERVICE-A.updated"));
        assert!(!topic_matches(&pattern, "configuration.SERVICE-B.updated"));
        assert!(!topic_matches(&pattern, "configuration.SERVICE-A"));
        assert!(!topic_matches(&pattern, "configuration.SERVICE-A.updated.extra"));

        assert!(topic_matches("configuration.#", "configuration.SERVICE-A.deleted"));
        assert!(topic_matches("configuration.#", "configuration"));
        assert!(topic_matches("#.deleted", "configuration.SERVICE-A.deleted"));
    }
}
