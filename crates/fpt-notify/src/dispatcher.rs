//! Dispatcher: deliver pending records through the transport chain and
//! record the outcome remotely.

use std::sync::Arc;

use fpt_core::enums::NotificationStatus;
use fpt_core::notification::{DispatchOutcome, NotificationRecord};
use fpt_core::report::Reporter;
use fpt_store::RemoteStore;
use serde_json::json;

use crate::error::NotifyError;
use crate::render::Renderer;
use crate::transport::TransportChain;

pub struct Dispatcher {
    store: Arc<dyn RemoteStore>,
    chain: TransportChain,
    renderer: Renderer,
    reporter: Arc<dyn Reporter>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        chain: TransportChain,
        renderer: Renderer,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            store,
            chain,
            renderer,
            reporter,
        }
    }

    /// Make one attempt sequence for `record` and mark it `sent` or `failed`.
    ///
    /// A delivery failure is not an error: it is returned as an unsuccessful
    /// [`DispatchOutcome`] after the record is marked `failed`. Marking is
    /// best effort; a failed status update is logged and not retried.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::NoTransport`] when the chain is empty (nothing is marked)
    /// - [`NotifyError::AlreadyDispatched`] when the record is not `pending`
    pub async fn send(&self, record: &mut NotificationRecord) -> Result<DispatchOutcome, NotifyError> {
        self.chain.ensure_ready()?;
        if record.status != NotificationStatus::Pending {
            return Err(NotifyError::AlreadyDispatched {
                id: record.id.clone(),
                status: record.status.to_string(),
            });
        }

        let reporter = self.reporter.scoped("notification", &record.id);
        let delivery = match record.recipient_email.as_deref().filter(|to| !to.is_empty()) {
            Some(to) => {
                reporter.debug(&format!("Sending {} to {to}", record.kind));
                let email = self.renderer.notification(record, to);
                self.chain.deliver(&email, reporter.as_ref()).await
            }
            None => Err(NotifyError::MissingRecipient(record.id.clone())),
        };

        match delivery {
            Ok(transport) => {
                record.transition(NotificationStatus::Sent)?;
                self.mark(record, None, reporter.as_ref()).await;
                reporter.info(&format!("Sent via {transport}"));
                Ok(DispatchOutcome {
                    id: record.id.clone(),
                    success: true,
                    transport: Some(transport),
                    error: None,
                })
            }
            Err(error) => {
                let message = error.to_string();
                record.transition(NotificationStatus::Failed)?;
                self.mark(record, Some(&message), reporter.as_ref()).await;
                reporter.error(&message);
                Ok(DispatchOutcome {
                    id: record.id.clone(),
                    success: false,
                    transport: None,
                    error: Some(message),
                })
            }
        }
    }

    /// Send every record in order. Records that are no longer `pending` are
    /// skipped and produce no outcome.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NoTransport`] before sending anything when the
    /// chain is empty.
    pub async fn dispatch(
        &self,
        records: Vec<NotificationRecord>,
    ) -> Result<Vec<DispatchOutcome>, NotifyError> {
        self.chain.ensure_ready()?;
        let mut outcomes = Vec::with_capacity(records.len());
        for mut record in records {
            match self.send(&mut record).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(NotifyError::AlreadyDispatched { id, status }) => {
                    self.reporter
                        .debug(&format!("Skipping notification {id}: already {status}"));
                }
                Err(error) => return Err(error),
            }
        }
        let sent = outcomes.iter().filter(|o| o.success).count();
        self.reporter.info(&format!(
            "Notifications processed: {sent} sent, {} failed",
            outcomes.len() - sent
        ));
        Ok(outcomes)
    }

    async fn mark(&self, record: &NotificationRecord, error: Option<&str>, reporter: &dyn Reporter) {
        let result = match error {
            None => {
                self.store
                    .rpc(
                        "mark_notification_sent",
                        json!({ "notification_id": record.id }),
                    )
                    .await
            }
            Some(message) => {
                self.store
                    .rpc(
                        "mark_notification_failed",
                        json!({ "notification_id": record.id, "error_msg": message }),
                    )
                    .await
            }
        };
        if let Err(error) = result {
            reporter.warn(&format!("Could not record status {}: {error}", record.status));
        }
    }
}
