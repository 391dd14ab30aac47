//! Payment repository port.
//!
//! # Design
//!
//! - **Idempotency key**: `gateway_session_id` is unique
//! - **Serialization point**: `transition_if_pending` is the compare-and-set
//!   that decides which reconciliation runs side effects

use crate::domain::dues::{Payment, PaymentOutcome};
use crate::domain::foundation::{DomainError, GatewaySessionId, MemberId, PaymentId};
use async_trait::async_trait;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persist a new pending payment.
    ///
    /// # Errors
    ///
    /// - `PaymentExists` if the gateway session id is already recorded
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    async fn find_by_session(
        &self,
        session_id: &GatewaySessionId,
    ) -> Result<Option<Payment>, DomainError>;

    /// Applies `outcome` only if the payment is still `Pending`.
    ///
    /// Returns the updated payment, or `None` if another writer already
    /// moved it out of `Pending`.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if no payment has this session id
    async fn transition_if_pending(
        &self,
        session_id: &GatewaySessionId,
        outcome: &PaymentOutcome,
    ) -> Result<Option<Payment>, DomainError>;

    /// Payments for a member, newest first.
    async fn list_for_member(&self, member_id: &MemberId) -> Result<Vec<Payment>, DomainError>;
}
