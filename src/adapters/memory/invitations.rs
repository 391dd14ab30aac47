use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::foundation::{DomainError, ErrorCode, InvitationId, MemberId, Timestamp};
use crate::domain::invitation::{Invitation, InvitationStatus, TokenHash};
use crate::ports::InvitationRepository;

#[async_trait]
impl InvitationRepository for InMemoryStore {
    async fn insert(&self, invitation: &Invitation) -> Result<(), DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let taken = state.invitations.contains_key(&invitation.id)
            || state
                .invitations
                .values()
                .any(|i| i.token_hash == invitation.token_hash);
        if taken {
            return Err(DomainError::new(ErrorCode::InvitationExists, "Invitation already stored")
                .with_detail("key", invitation.id.to_string()));
        }
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &InvitationId) -> Result<Option<Invitation>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.invitations.get(id).cloned())
    }

    async fn find_by_token_hash(&self, hash: &TokenHash) -> Result<Option<Invitation>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .invitations
            .values()
            .find(|i| i.token_hash.matches(hash))
            .cloned())
    }

    async fn mark_used(
        &self,
        id: &InvitationId,
        member_id: &MemberId,
        used_at: Timestamp,
    ) -> Result<Option<Invitation>, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let invitation = state.invitations.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::InvitationNotFound, "Invitation not found")
                .with_detail("key", id.to_string())
        })?;
        if invitation.status != InvitationStatus::Sent {
            return Ok(None);
        }
        invitation.mark_used(*member_id, used_at)?;
        Ok(Some(invitation.clone()))
    }

    async fn mark_expired(&self, id: &InvitationId) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        match state.invitations.get_mut(id) {
            Some(invitation) if invitation.status == InvitationStatus::Sent => {
                invitation.mark_expired()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_sent_before(&self, now: Timestamp) -> Result<u64, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let mut count = 0;
        for invitation in state.invitations.values_mut() {
            if invitation.status == InvitationStatus::Sent && invitation.is_expired_at(now) {
                invitation.mark_expired()?;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<Invitation>, DomainError> {
        self.check_available()?;
        let mut all: Vec<Invitation> = self.state.read().await.invitations.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}
