//! Activity event records.
//!
//! Append-only records of something that happened during a handshake,
//! classified through the action registry at construction time. Consumers
//! (the downstream log sink) only ever read these; nothing mutates or
//! deletes them.

use crate::actions::{self, ActionCategory, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A classified record of one handshake step.
///
/// Duplicate delivery is harmless: applying the same event twice to a log
/// sink changes nothing observable outside the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Unique id for this record (dedup aid for sinks that want it).
    pub event_id: Uuid,
    pub user_id: String,
    /// Raw action code, e.g. `user_validated`.
    pub action: String,
    pub category: ActionCategory,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ActivityEvent {
    /// Build a fully classified event for `action`.
    ///
    /// Category, description and severity come from the registry, so two
    /// services recording the same action code always classify it the same
    /// way. Unknown codes classify to the registry's safe default rather
    /// than failing.
    #[must_use]
    pub fn record(user_id: &str, action: &str, metadata: Option<serde_json::Value>) -> Self {
        let meta = actions::metadata_for(action);
        Self {
            event_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            category: meta.category,
            description: meta.description.to_string(),
            severity: meta.default_severity,
            timestamp: Utc::now(),
            metadata,
        }
    }
}
