//! Event routing - dispatches verified billing events to handlers.
//!
//! A registry maps each known event kind to exactly one handler. Kinds
//! without a registered handler are acknowledged and skipped so the
//! provider never retries events this system does not care about.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::billing_event::{BillingEvent, BillingEventKind};
use super::errors::BillingError;

/// Result of handling a single billing event.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// The entitlement record was written.
    Applied,

    /// The stored record was newer than the event; nothing was written.
    Stale,

    /// The event was acknowledged without a write.
    Skipped(String),
}

/// Handler for one billing event kind.
///
/// Implementations are stateless beyond their injected ports and must be
/// safe to invoke multiple times for the same event.
#[async_trait]
pub trait BillingEventHandler: Send + Sync {
    /// The event kind this handler processes.
    fn kind(&self) -> BillingEventKind;

    /// Handles a verified event.
    ///
    /// `Err(BillingError::Ignored(_))` means acknowledge without
    /// processing; other errors surface to the HTTP layer.
    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, BillingError>;
}

/// Registry-based event router.
pub struct EventRouter {
    handlers: HashMap<BillingEventKind, Arc<dyn BillingEventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler under its declared kind. Last registration for
    /// a kind wins.
    pub fn register(mut self, handler: Arc<dyn BillingEventHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    pub fn handler_for(&self, kind: BillingEventKind) -> Option<&dyn BillingEventHandler> {
        self.handlers.get(&kind).map(Arc::as_ref)
    }

    /// Routes an event to its handler.
    ///
    /// Unregistered kinds return `Skipped`, never an error; the provider
    /// must receive a 2xx for them.
    pub async fn route(&self, event: &BillingEvent) -> Result<HandlerOutcome, BillingError> {
        let kind = event.kind();
        match self.handler_for(kind) {
            Some(handler) => handler.handle(event).await,
            None => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "no handler registered, acknowledging"
                );
                Ok(HandlerOutcome::Skipped(format!(
                    "no handler for event type: {}",
                    event.event_type
                )))
            }
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}
