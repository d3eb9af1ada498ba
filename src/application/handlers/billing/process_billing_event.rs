//! ProcessBillingEventHandler - Command handler for signed webhook deliveries.

use std::sync::Arc;

use crate::domain::subscription::{
    BillingError, EventRouter, HandlerOutcome, WebhookVerifier,
};

/// Command to process one webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessBillingEventCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,

    /// Value of the signature header.
    pub signature: String,
}

/// Handler for webhook deliveries.
///
/// Verification happens on the raw bytes before any parsing; an event that
/// fails the signature check never reaches a handler.
pub struct ProcessBillingEventHandler {
    verifier: Arc<WebhookVerifier>,
    router: Arc<EventRouter>,
}

impl ProcessBillingEventHandler {
    pub fn new(verifier: Arc<WebhookVerifier>, router: Arc<EventRouter>) -> Self {
        Self { verifier, router }
    }

    pub async fn handle(
        &self,
        cmd: ProcessBillingEventCommand,
    ) -> Result<HandlerOutcome, BillingError> {
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)?;

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            live = event.is_live(),
            "billing event verified"
        );

        let outcome = self.router.route(&event).await?;

        if let HandlerOutcome::Stale = outcome {
            tracing::info!(event_id = %event.id, "event older than stored record, no-op");
        }

        Ok(outcome)
    }
}
