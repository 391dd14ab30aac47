use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::dues::{Payment, PaymentOutcome};
use crate::domain::foundation::{DomainError, ErrorCode, GatewaySessionId, MemberId, PaymentId};
use crate::ports::PaymentRepository;

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state
            .payments
            .values()
            .any(|p| p.gateway_session_id == payment.gateway_session_id)
        {
            return Err(DomainError::new(ErrorCode::PaymentExists, "Gateway session already recorded")
                .with_detail("key", payment.gateway_session_id.as_str()));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.payments.get(id).cloned())
    }

    async fn find_by_session(
        &self,
        session_id: &GatewaySessionId,
    ) -> Result<Option<Payment>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .payments
            .values()
            .find(|p| &p.gateway_session_id == session_id)
            .cloned())
    }

    async fn transition_if_pending(
        &self,
        session_id: &GatewaySessionId,
        outcome: &PaymentOutcome,
    ) -> Result<Option<Payment>, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let payment = state
            .payments
            .values_mut()
            .find(|p| &p.gateway_session_id == session_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("key", session_id.as_str())
            })?;
        if !payment.is_pending() {
            return Ok(None);
        }
        payment.apply(outcome)?;
        Ok(Some(payment.clone()))
    }

    async fn list_for_member(&self, member_id: &MemberId) -> Result<Vec<Payment>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| &p.member_id == member_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
