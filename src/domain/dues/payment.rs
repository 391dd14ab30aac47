//! Payment records.
//!
//! One record per attempted charge, keyed uniquely by the gateway session id.
//! A payment leaves `Pending` exactly once and is never mutated afterwards.

use crate::domain::foundation::{
    CycleId, DomainError, Email, ErrorCode, GatewaySessionId, MemberId, Money, PaymentId,
    StateMachine, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a payment attempt. Everything except `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    /// Reserved for gateway refunds; nothing in this crate produces it yet.
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(self, PaymentStatus::Pending) && !matches!(target, PaymentStatus::Pending)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            PaymentStatus::Pending => {
                vec![PaymentStatus::Paid, PaymentStatus::Failed, PaymentStatus::Refunded]
            }
            _ => vec![],
        }
    }
}

/// Terminal outcome applied to a pending payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid {
        payment_intent_id: Option<String>,
        at: Timestamp,
    },
    Failed {
        at: Timestamp,
    },
}

impl PaymentOutcome {
    pub fn status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Paid { .. } => PaymentStatus::Paid,
            PaymentOutcome::Failed { .. } => PaymentStatus::Failed,
        }
    }
}

/// Payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub member_id: MemberId,
    pub cycle_id: Option<CycleId>,
    pub email: Email,
    pub gateway_session_id: GatewaySessionId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub gateway_payment_intent_id: Option<String>,
}

impl Payment {
    /// Creates a pending payment for a checkout session.
    pub fn pending(
        member_id: MemberId,
        cycle_id: Option<CycleId>,
        email: Email,
        gateway_session_id: GatewaySessionId,
        amount: Money,
        description: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            member_id,
            cycle_id,
            email,
            gateway_session_id,
            amount,
            status: PaymentStatus::Pending,
            description,
            created_at: now,
            updated_at: now,
            paid_at: None,
            gateway_payment_intent_id: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Moves a pending payment to its terminal status.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` if the payment already left `Pending`.
    pub fn apply(&mut self, outcome: &PaymentOutcome) -> Result<(), DomainError> {
        let target = outcome.status();
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Payment {} is already {}", self.gateway_session_id, self.status),
            )
            .with_detail("from", self.status.as_str())
            .with_detail("to", target.as_str())
        })?;
        match outcome {
            PaymentOutcome::Paid {
                payment_intent_id,
                at,
            } => {
                self.paid_at = Some(*at);
                if payment_intent_id.is_some() {
                    self.gateway_payment_intent_id = payment_intent_id.clone();
                }
                self.updated_at = *at;
            }
            PaymentOutcome::Failed { at } => {
                self.updated_at = *at;
            }
        }
        Ok(())
    }
}
