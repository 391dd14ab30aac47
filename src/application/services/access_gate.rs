//! AccessGate - answers "can this identity use the protected area?"
//!
//! Read-only. The decision depends on member status alone; dues settlement
//! reaches it through promotion to `Active`.

use std::sync::Arc;

use crate::domain::access::{AccessDecision, DenialReason};
use crate::domain::foundation::Email;
use crate::domain::ClubError;

use super::MemberRegistry;

pub struct AccessGate {
    members: Arc<MemberRegistry>,
}

impl AccessGate {
    pub fn new(members: Arc<MemberRegistry>) -> Self {
        Self { members }
    }

    /// Decides access for `email`.
    ///
    /// A malformed email is denied as `NotAMember`. Store failures are
    /// returned as errors; callers must treat them as a denial.
    pub async fn check_access(&self, email: &str) -> Result<AccessDecision, ClubError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(AccessDecision::denied(DenialReason::NotAMember));
        };
        let member = self.members.find_by_email(&email).await?;
        Ok(AccessDecision::for_member(member))
    }

    pub async fn is_admin(&self, email: &str) -> Result<bool, ClubError> {
        Ok(self.check_access(email).await?.is_admin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::services::CreateMemberCommand;
    use crate::domain::member::MemberStatus;

    async fn gate_with(status: MemberStatus, is_admin: bool) -> (AccessGate, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let members = Arc::new(MemberRegistry::new(store.clone()));
        members
            .create_member(CreateMemberCommand {
                email: "a@x.org".to_string(),
                first_name: "A".to_string(),
                last_name: "X".to_string(),
                status: Some(status),
                is_admin,
            })
            .await
            .unwrap();
        (AccessGate::new(members), store)
    }

    #[tokio::test]
    async fn active_member_has_access() {
        let (gate, _) = gate_with(MemberStatus::Active, false).await;
        let decision = gate.check_access("A@x.org").await.unwrap();

        assert!(decision.has_access);
        assert!(decision.reason.is_none());
        assert!(!gate.is_admin("a@x.org").await.unwrap());
    }

    #[tokio::test]
    async fn pending_payment_is_denied_with_reason() {
        let (gate, _) = gate_with(MemberStatus::PendingPayment, true).await;
        let decision = gate.check_access("a@x.org").await.unwrap();

        assert!(!decision.has_access);
        assert_eq!(decision.reason, Some(DenialReason::PaymentPending));
        assert!(decision.member.is_some());
        assert!(!gate.is_admin("a@x.org").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_or_malformed_email_is_not_a_member() {
        let (gate, _) = gate_with(MemberStatus::Active, true).await;

        for email in ["b@x.org", "garbage"] {
            let decision = gate.check_access(email).await.unwrap();
            assert_eq!(decision.reason, Some(DenialReason::NotAMember));
        }
    }

    #[tokio::test]
    async fn store_failure_is_an_error() {
        let (gate, store) = gate_with(MemberStatus::Active, true).await;
        store.set_unavailable(true);

        assert!(gate.check_access("a@x.org").await.unwrap_err().is_retryable());
    }
}
