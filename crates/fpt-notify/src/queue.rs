//! Reading pending notification records.

use std::collections::HashMap;
use std::sync::Arc;

use fpt_core::enums::NotificationKind;
use fpt_core::notification::NotificationRecord;
use fpt_core::row::{self, Row};
use fpt_store::{Order, Query, RemoteStore};
use serde_json::{Value, json};

use crate::error::NotifyError;

pub struct NotificationQueue {
    store: Arc<dyn RemoteStore>,
}

impl NotificationQueue {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Oldest `limit` pending records of any kind, with recipient address
    /// and name resolved by the `get_pending_notifications` procedure.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if the procedure fails and
    /// [`NotifyError::Malformed`] if a record does not decode.
    pub async fn pending(&self, limit: usize) -> Result<Vec<NotificationRecord>, NotifyError> {
        let value = self
            .store
            .rpc("get_pending_notifications", json!({ "limit_count": limit }))
            .await?;
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.into_iter().map(decode).collect(),
            other => Err(NotifyError::Malformed {
                what: "pending notifications",
                message: format!("expected an array, got {other}"),
            }),
        }
    }

    /// Oldest `limit` pending records of one kind. Recipient address and
    /// name are looked up in `profiles` when the record does not carry them.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if either query fails.
    pub async fn pending_of_kind(
        &self,
        kind: NotificationKind,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, NotifyError> {
        let rows = self
            .store
            .select(
                &Query::table("notifications")
                    .eq("status", "pending")
                    .eq("notification_type", kind.as_str())
                    .order("created_at", Order::Asc)
                    .limit(limit),
            )
            .await?;

        let mut profiles: HashMap<String, Option<Row>> = HashMap::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = decode(Value::Object(row))?;
            if record.recipient_email.is_none()
                && let Some(recipient) = record.recipient_id.clone()
            {
                if !profiles.contains_key(&recipient) {
                    let profile = self.profile(&recipient).await?;
                    profiles.insert(recipient.clone(), profile);
                }
                if let Some(Some(profile)) = profiles.get(&recipient) {
                    record.recipient_email = row::text(profile, "email").map(String::from);
                    record.recipient_name = row::text(profile, "full_name").map(String::from);
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Row>, NotifyError> {
        let mut rows = self
            .store
            .select(
                &Query::table("profiles")
                    .columns("id,email,full_name")
                    .eq("id", user_id)
                    .limit(1),
            )
            .await?;
        Ok(rows.pop())
    }
}

/// Decode one record. Procedure rows may repeat the id as `notification_id`
/// and the kind as `type`; the table column wins when both are present.
fn decode(value: Value) -> Result<NotificationRecord, NotifyError> {
    let value = match value {
        Value::Object(mut map) => {
            for (alias, column) in [("notification_id", "id"), ("type", "notification_type")] {
                if let Some(v) = map.remove(alias) {
                    map.entry(column).or_insert(v);
                }
            }
            Value::Object(map)
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|error| NotifyError::Malformed {
        what: "notification",
        message: error.to_string(),
    })
}
