//! Stripe webhook gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe Checkout webhooks.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (configurable window) against replayed deliveries
//! - Secret handled via `secrecy::SecretString`
//!
//! # Event mapping
//!
//! | Stripe event | Gateway event |
//! |--------------|---------------|
//! | `checkout.session.completed` (paid) | `CheckoutCompleted` |
//! | `checkout.session.async_payment_succeeded` | `CheckoutCompleted` |
//! | `checkout.session.expired` | `CheckoutFailed` |
//! | `checkout.session.async_payment_failed` | `CheckoutFailed` |
//! | anything else | `Ignored` |

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{DomainError, ErrorCode, GatewaySessionId};
use crate::ports::{GatewayEvent, GatewayEventKind, PaymentGateway};

use super::webhook_types::{SignatureHeader, StripeCheckoutSession, StripeWebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe webhook configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    tolerance_secs: i64,

    /// Reject test-mode events.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: SecretString::new(webhook_secret.into()),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    pub fn with_tolerance_secs(mut self, secs: i64) -> Self {
        self.tolerance_secs = secs;
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Verifies and translates Stripe Checkout webhooks.
pub struct StripeWebhookGateway {
    config: StripeConfig,
}

impl StripeWebhookGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self { config }
    }

    /// Verifies and parses a webhook as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> Result<GatewayEvent, DomainError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            invalid_signature(e.to_string())
        })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, &header, now)?;

        // 3. Parse and convert event
        let event = self.parse_event(payload)?;

        tracing::info!(event_id = %event.event_id, "Webhook signature verified");
        Ok(event)
    }

    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), DomainError> {
        // 1. Validate timestamp
        let Some(age) = now.checked_sub(header.timestamp) else {
            tracing::warn!(event_timestamp = header.timestamp, "Webhook timestamp out of range");
            return Err(invalid_signature("Event timestamp out of range"));
        };
        if age > self.config.tolerance_secs {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay"
            );
            return Err(invalid_signature(format!("Event too old ({} seconds)", age)));
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(invalid_signature("Event timestamp in future"));
        }

        // 2. Compute expected signature
        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        // 3. Constant-time comparison against every v1 entry
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| candidate.len() == expected.len() && bool::from(expected.ct_eq(candidate)));
        if !matched {
            tracing::warn!("Webhook signature mismatch");
            return Err(invalid_signature("Signature mismatch"));
        }
        Ok(())
    }

    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, DomainError> {
        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            DomainError::validation("payload", format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Rejected test mode event");
            return Err(invalid_signature("Test mode events not allowed"));
        }

        let kind = match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session = checkout_session(&event)?;
                if session.is_settled() {
                    completed(session)?
                } else {
                    // Delayed payment methods settle via async_payment_succeeded
                    GatewayEventKind::Ignored {
                        event_type: event.event_type.clone(),
                    }
                }
            }
            "checkout.session.async_payment_succeeded" => completed(checkout_session(&event)?)?,
            "checkout.session.expired" | "checkout.session.async_payment_failed" => {
                GatewayEventKind::CheckoutFailed {
                    session_id: session_id(&checkout_session(&event)?)?,
                }
            }
            other => GatewayEventKind::Ignored {
                event_type: other.to_string(),
            },
        };

        Ok(GatewayEvent {
            event_id: event.id,
            kind,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeWebhookGateway {
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, DomainError> {
        self.verify_at(payload, signature, chrono::Utc::now().timestamp())
    }
}

fn invalid_signature(message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::InvalidWebhookSignature, message)
}

fn checkout_session(event: &StripeWebhookEvent) -> Result<StripeCheckoutSession, DomainError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        DomainError::validation("data.object", format!("Invalid checkout session: {}", e))
    })
}

fn session_id(session: &StripeCheckoutSession) -> Result<GatewaySessionId, DomainError> {
    GatewaySessionId::new(session.id.clone())
        .map_err(|e| DomainError::validation("data.object.id", e.to_string()))
}

fn completed(session: StripeCheckoutSession) -> Result<GatewayEventKind, DomainError> {
    Ok(GatewayEventKind::CheckoutCompleted {
        session_id: session_id(&session)?,
        payment_intent_id: session.payment_intent,
    })
}

/// Builds a `Stripe-Signature` header value for `payload`.
///
/// Used by tests and local tooling that replay events.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={}", timestamp),
    };
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_704_067_200;

    fn gateway() -> StripeWebhookGateway {
        StripeWebhookGateway::new(StripeConfig::new(SECRET))
    }

    fn event(event_type: &str, payment_status: &str) -> String {
        format!(
            r#"{{
                "id": "evt_test123",
                "type": "{}",
                "created": {},
                "data": {{
                    "object": {{
                        "id": "cs_test_1",
                        "object": "checkout.session",
                        "payment_status": "{}",
                        "status": "complete",
                        "payment_intent": "pi_1",
                        "mode": "payment",
                        "metadata": {{}}
                    }}
                }},
                "livemode": false
            }}"#,
            event_type, NOW, payment_status
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature verification
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_and_payload() {
        let payload = event("checkout.session.completed", "paid");
        let signature = sign_payload(SECRET, NOW, &payload);

        let parsed = gateway().verify_at(payload.as_bytes(), &signature, NOW).unwrap();

        assert_eq!(parsed.event_id, "evt_test123");
        assert_eq!(
            parsed.kind,
            GatewayEventKind::CheckoutCompleted {
                session_id: GatewaySessionId::new("cs_test_1").unwrap(),
                payment_intent_id: Some("pi_1".to_string()),
            }
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = event("checkout.session.completed", "paid");
        let signature = sign_payload("whsec_other", NOW, &payload);

        let err = gateway().verify_at(payload.as_bytes(), &signature, NOW).unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidWebhookSignature);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = event("checkout.session.completed", "paid");
        let signature = sign_payload(SECRET, NOW, &payload);
        let tampered = payload.replace("cs_test_1", "cs_test_2");

        assert!(gateway().verify_at(tampered.as_bytes(), &signature, NOW).is_err());
    }

    #[test]
    fn rolled_secret_accepts_any_matching_v1() {
        let payload = event("checkout.session.completed", "paid");
        let good = sign_payload(SECRET, NOW, &payload);
        let header = format!("t={},v1={},{}", NOW, "0".repeat(64), good.split_once(',').unwrap().1);

        assert!(gateway().verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn timestamp_window_is_enforced() {
        let payload = event("checkout.session.completed", "paid");
        let signature = sign_payload(SECRET, NOW, &payload);

        assert!(gateway()
            .verify_at(payload.as_bytes(), &signature, NOW + DEFAULT_TOLERANCE_SECS)
            .is_ok());
        assert!(gateway()
            .verify_at(payload.as_bytes(), &signature, NOW + DEFAULT_TOLERANCE_SECS + 1)
            .is_err());
        assert!(gateway()
            .verify_at(payload.as_bytes(), &signature, NOW - MAX_FUTURE_TOLERANCE_SECS - 1)
            .is_err());
    }

    #[test]
    fn extreme_timestamps_are_rejected() {
        let payload = event("checkout.session.completed", "paid");

        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1=00", t);
            let err = gateway()
                .verify_at(payload.as_bytes(), &header, NOW)
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidWebhookSignature);
        }

        let signed = sign_payload(SECRET, i64::MIN, &payload);
        assert!(gateway().verify_at(payload.as_bytes(), &signed, NOW).is_err());
    }

    #[test]
    fn custom_tolerance_applies() {
        let gateway = StripeWebhookGateway::new(StripeConfig::new(SECRET).with_tolerance_secs(10));
        let payload = event("checkout.session.completed", "paid");
        let signature = sign_payload(SECRET, NOW, &payload);

        assert!(gateway.verify_at(payload.as_bytes(), &signature, NOW + 11).is_err());
    }

    #[test]
    fn invalid_json_is_validation_error() {
        let payload = "not valid json";
        let signature = sign_payload(SECRET, NOW, payload);

        let err = gateway().verify_at(payload.as_bytes(), &signature, NOW).unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("Invalid JSON"));
    }

    #[test]
    fn livemode_requirement_rejects_test_events() {
        let gateway = StripeWebhookGateway::new(StripeConfig::new(SECRET).with_require_livemode(true));
        let payload = event("checkout.session.completed", "paid");
        let signature = sign_payload(SECRET, NOW, &payload);

        assert!(gateway.verify_at(payload.as_bytes(), &signature, NOW).is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event mapping
    // ════════════════════════════════════════════════════════════════════════════

    fn kind_of(event_type: &str, payment_status: &str) -> GatewayEventKind {
        let payload = event(event_type, payment_status);
        let signature = sign_payload(SECRET, NOW, &payload);
        gateway().verify_at(payload.as_bytes(), &signature, NOW).unwrap().kind
    }

    #[test]
    fn unpaid_completion_waits_for_async_success() {
        assert!(matches!(
            kind_of("checkout.session.completed", "unpaid"),
            GatewayEventKind::Ignored { .. }
        ));
        assert!(matches!(
            kind_of("checkout.session.async_payment_succeeded", "paid"),
            GatewayEventKind::CheckoutCompleted { .. }
        ));
    }

    #[test]
    fn expired_and_failed_sessions_map_to_failure() {
        for event_type in ["checkout.session.expired", "checkout.session.async_payment_failed"] {
            assert_eq!(
                kind_of(event_type, "unpaid"),
                GatewayEventKind::CheckoutFailed {
                    session_id: GatewaySessionId::new("cs_test_1").unwrap()
                }
            );
        }
    }

    #[test]
    fn other_events_are_ignored() {
        assert_eq!(
            kind_of("invoice.paid", "paid"),
            GatewayEventKind::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }
}
