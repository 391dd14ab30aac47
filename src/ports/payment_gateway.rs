//! Payment gateway port (inbound webhooks).
//!
//! Checkout initiation happens outside this crate; the gateway's only
//! inbound contract is an at-least-once webhook carrying a session id.

use crate::domain::foundation::{DomainError, GatewaySessionId};
use async_trait::async_trait;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Verify a webhook signature and parse the event.
    ///
    /// # Errors
    ///
    /// - `InvalidWebhookSignature` if the signature or timestamp is rejected
    /// - `ValidationFailed` if the payload cannot be parsed
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, DomainError>;
}

/// A verified gateway notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    /// Gateway's event id, for logging.
    pub event_id: String,
    pub kind: GatewayEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    /// Charge succeeded for a checkout session.
    CheckoutCompleted {
        session_id: GatewaySessionId,
        payment_intent_id: Option<String>,
    },

    /// Checkout session expired or its payment failed.
    CheckoutFailed { session_id: GatewaySessionId },

    /// Event type this crate does not act on.
    Ignored { event_type: String },
}
