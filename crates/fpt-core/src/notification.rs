//! Notification records materialized by the remote rule evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::enums::{NotificationKind, NotificationStatus};
use crate::errors::CoreError;

/// A unit of pending outbound communication.
///
/// Field aliases accept both the `notifications` table columns and the shape
/// returned by the `get_pending_notifications` RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(alias = "notification_id")]
    pub id: String,

    #[serde(rename = "notification_type", alias = "type")]
    pub kind: NotificationKind,

    #[serde(default)]
    pub recipient_id: Option<String>,

    #[serde(default)]
    pub recipient_email: Option<String>,

    #[serde(default)]
    pub recipient_name: Option<String>,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub body: String,

    /// Free-form rendering context (task name, due date, budget figures, ...).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Map<String, Value>,

    #[serde(default)]
    pub status: NotificationStatus,

    #[serde(default)]
    pub related_entity_id: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NotificationRecord {
    /// Move the record to `next`, enforcing the status state machine.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] when `next` is not reachable
    /// from the current status (e.g. `sent → pending`).
    pub fn transition(&mut self, next: NotificationStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "notification".to_string(),
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Read a metadata value as display text.
    #[must_use]
    pub fn meta_text(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Read a metadata value as a number.
    #[must_use]
    pub fn meta_number(&self, key: &str) -> Option<f64> {
        match self.metadata.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of one dispatch attempt sequence for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub id: String,
    pub success: bool,
    /// Transport that delivered the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_rpc_shape() {
        let record: NotificationRecord = serde_json::from_value(json!({
            "notification_id": "n-1",
            "notification_type": "task_deadline",
            "recipient_email": "pm@example.com",
            "subject": "Task due",
            "body": "Inspect sprinklers",
            "related_entity_type": "task",
            "related_entity_id": "t-9",
            "metadata": null
        }))
        .unwrap();

        assert_eq!(record.id, "n-1");
        assert_eq!(record.kind, NotificationKind::TaskDeadline);
        assert_eq!(record.status, NotificationStatus::Pending);
        assert!(record.metadata.is_empty());
        assert_eq!(record.related_entity_id.as_deref(), Some("t-9"));
    }

    #[test]
    fn parses_table_shape() {
        let record: NotificationRecord = serde_json::from_value(json!({
            "id": "n-2",
            "notification_type": "budget_alert",
            "recipient_id": "u-1",
            "status": "sent",
            "metadata": {"project_name": "Hospital", "variance_percentage": 12.5},
            "created_at": "2026-10-17T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.status, NotificationStatus::Sent);
        assert_eq!(record.meta_text("project_name").as_deref(), Some("Hospital"));
        assert_eq!(record.meta_number("variance_percentage"), Some(12.5));
        assert!(record.created_at.is_some());
    }

    #[test]
    fn transition_refuses_to_revert_terminal_status() {
        let mut record: NotificationRecord = serde_json::from_value(json!({
            "id": "n-3",
            "notification_type": "digest"
        }))
        .unwrap();

        record.transition(NotificationStatus::Sent).unwrap();
        let err = record
            .transition(NotificationStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(record.status, NotificationStatus::Sent);
    }
}
