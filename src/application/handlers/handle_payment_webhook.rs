//! HandlePaymentWebhookHandler - Command handler for payment gateway webhooks.
//!
//! Gateways retry until they see a success response. Every outcome that
//! needs no retry (reconciled, replayed, unknown session, ignored type) is
//! returned as `Ok`; only transient failures surface as a retryable error.

use std::sync::Arc;

use crate::application::services::DuesLedger;
use crate::domain::foundation::{CycleId, ErrorCode, GatewaySessionId, MemberId, PaymentId};
use crate::domain::ClubError;
use crate::ports::{GatewayEventKind, PaymentGateway};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw webhook payload.
    pub payload: Vec<u8>,
    /// Webhook signature header.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentWebhookResult {
    /// Payment moved to `Paid` by this delivery.
    Reconciled {
        payment_id: PaymentId,
        member_id: MemberId,
        cycle_id: Option<CycleId>,
    },
    /// Payment was already terminal; remaining side effects re-applied.
    Replayed { payment_id: PaymentId },
    /// Checkout failed or expired; payment marked failed.
    PaymentFailed { payment_id: PaymentId },
    /// Session was never recorded here (e.g. gateway test events).
    UnknownSession { session_id: GatewaySessionId },
    /// Event type not acted on.
    Ignored { event_type: String },
}

/// Handler for processing payment gateway webhooks.
pub struct HandlePaymentWebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<DuesLedger>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, ledger: Arc<DuesLedger>) -> Self {
        Self { gateway, ledger }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, ClubError> {
        // 1. Verify webhook signature and parse event
        let event = self
            .gateway
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|err| match err.code {
                ErrorCode::ValidationFailed => ClubError::from(err),
                _ => ClubError::InvalidWebhookSignature,
            })?;

        tracing::info!(event_id = %event.event_id, "Payment webhook received");

        // 2. Dispatch on event kind
        match event.kind {
            GatewayEventKind::CheckoutCompleted {
                session_id,
                payment_intent_id,
            } => {
                let outcome = self
                    .ledger
                    .reconcile(&session_id, payment_intent_id)
                    .await
                    .inspect_err(|err| {
                        tracing::error!(session_id = %session_id, error = %err, "Reconcile failed")
                    })?;
                Ok(match outcome {
                    None => HandlePaymentWebhookResult::UnknownSession { session_id },
                    Some(r) if r.applied => HandlePaymentWebhookResult::Reconciled {
                        payment_id: r.payment.id,
                        member_id: r.member_id,
                        cycle_id: r.cycle_id,
                    },
                    Some(r) => HandlePaymentWebhookResult::Replayed {
                        payment_id: r.payment.id,
                    },
                })
            }
            GatewayEventKind::CheckoutFailed { session_id } => {
                Ok(match self.ledger.record_failure(&session_id).await? {
                    None => HandlePaymentWebhookResult::UnknownSession { session_id },
                    Some(payment) => HandlePaymentWebhookResult::PaymentFailed {
                        payment_id: payment.id,
                    },
                })
            }
            GatewayEventKind::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Webhook event ignored");
                Ok(HandlePaymentWebhookResult::Ignored { event_type })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::services::{
        CreateCycleCommand, CreateMemberCommand, CreatePaymentCommand, CycleDefaults,
        DuesCycleManager, MemberRegistry,
    };
    use crate::domain::dues::PaymentStatus;
    use crate::domain::foundation::{AdminId, DomainError};
    use crate::domain::member::MemberStatus;
    use crate::ports::GatewayEvent;
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct MockGateway {
        event: Option<GatewayEventKind>,
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn verify_webhook(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<GatewayEvent, DomainError> {
            match &self.event {
                Some(kind) => Ok(GatewayEvent {
                    event_id: "evt_1".to_string(),
                    kind: kind.clone(),
                }),
                None => Err(DomainError::new(
                    ErrorCode::InvalidWebhookSignature,
                    "Invalid webhook signature",
                )),
            }
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        ledger: Arc<DuesLedger>,
        members: Arc<MemberRegistry>,
        member_id: MemberId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let members = Arc::new(MemberRegistry::new(store.clone()));
        let cycles = Arc::new(DuesCycleManager::new(store.clone(), CycleDefaults::default()));
        let ledger = Arc::new(DuesLedger::new(
            store.clone(),
            store.clone(),
            members.clone(),
            cycles.clone(),
        ));

        let cycle = cycles
            .create_cycle(CreateCycleCommand {
                ending_year: 2026,
                amount_cents: 8500,
                currency: None,
                grace_days: None,
                created_by: AdminId::new("admin_1").unwrap(),
            })
            .await
            .unwrap();
        cycles.activate_cycle(&cycle.id).await.unwrap();
        let member = members
            .create_member(CreateMemberCommand {
                email: "a@x.org".to_string(),
                first_name: "A".to_string(),
                last_name: "X".to_string(),
                status: Some(MemberStatus::PendingPayment),
                is_admin: false,
            })
            .await
            .unwrap();
        ledger
            .create_payment(CreatePaymentCommand {
                member_id: member.id,
                cycle_id: Some(cycle.id),
                email: "a@x.org".to_string(),
                gateway_session_id: "sess_1".to_string(),
                amount_cents: 8500,
                currency: "USD".to_string(),
                description: None,
            })
            .await
            .unwrap();

        Fixture {
            store,
            ledger,
            members,
            member_id: member.id,
        }
    }

    fn handler(f: &Fixture, event: Option<GatewayEventKind>) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(Arc::new(MockGateway { event }), f.ledger.clone())
    }

    fn completed(session: &str) -> Option<GatewayEventKind> {
        Some(GatewayEventKind::CheckoutCompleted {
            session_id: GatewaySessionId::new(session).unwrap(),
            payment_intent_id: Some("pi_1".to_string()),
        })
    }

    fn cmd() -> HandlePaymentWebhookCommand {
        HandlePaymentWebhookCommand {
            payload: b"{}".to_vec(),
            signature: "t=1,v1=abc".to_string(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_checkout_reconciles_then_replays() {
        let f = fixture().await;
        let handler = handler(&f, completed("sess_1"));

        let first = handler.handle(cmd()).await.unwrap();
        let second = handler.handle(cmd()).await.unwrap();

        assert!(matches!(first, HandlePaymentWebhookResult::Reconciled { member_id, .. } if member_id == f.member_id));
        assert!(matches!(second, HandlePaymentWebhookResult::Replayed { .. }));
        assert_eq!(f.store.payment_count().await, 1);
        assert_eq!(
            f.members.get_by_id(&f.member_id).await.unwrap().status,
            MemberStatus::Active
        );
    }

    #[tokio::test]
    async fn unknown_session_is_acknowledged() {
        let f = fixture().await;
        let result = handler(&f, completed("sess_other")).handle(cmd()).await.unwrap();
        assert!(matches!(result, HandlePaymentWebhookResult::UnknownSession { .. }));
    }

    #[tokio::test]
    async fn failed_checkout_marks_payment_failed() {
        let f = fixture().await;
        let event = Some(GatewayEventKind::CheckoutFailed {
            session_id: GatewaySessionId::new("sess_1").unwrap(),
        });

        let result = handler(&f, event).handle(cmd()).await.unwrap();

        assert!(matches!(result, HandlePaymentWebhookResult::PaymentFailed { .. }));
        let payments = f.ledger.list_payments_for_member(&f.member_id).await.unwrap();
        assert_eq!(payments[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let f = fixture().await;
        let err = handler(&f, None).handle(cmd()).await.unwrap_err();
        assert_eq!(err, ClubError::InvalidWebhookSignature);
    }

    #[tokio::test]
    async fn transient_failure_is_retryable_and_retry_completes() {
        let f = fixture().await;
        let handler = handler(&f, completed("sess_1"));
        f.store.fail_dues_writes(true);

        let err = handler.handle(cmd()).await.unwrap_err();
        assert!(err.is_retryable());

        f.store.fail_dues_writes(false);
        let retry = handler.handle(cmd()).await.unwrap();

        assert!(matches!(retry, HandlePaymentWebhookResult::Replayed { .. }));
        assert_eq!(
            f.members.get_by_id(&f.member_id).await.unwrap().status,
            MemberStatus::Active
        );
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let f = fixture().await;
        let event = Some(GatewayEventKind::Ignored {
            event_type: "invoice.paid".to_string(),
        });
        let result = handler(&f, event).handle(cmd()).await.unwrap();
        assert_eq!(
            result,
            HandlePaymentWebhookResult::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }
}
