//! Invitation repository port.
//!
//! # Design
//!
//! - **Lookup by hash**: invitations are found by the hash of a presented
//!   token, never by the raw token
//! - **Compare-and-set**: `mark_used` and `mark_expired` only succeed from
//!   `Sent`, so at most one redemption wins

use crate::domain::foundation::{DomainError, InvitationId, MemberId, Timestamp};
use crate::domain::invitation::{Invitation, TokenHash};
use async_trait::async_trait;

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Persist a new invitation.
    ///
    /// # Errors
    ///
    /// - `InvitationExists` if the id or token hash is already stored
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, invitation: &Invitation) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &InvitationId) -> Result<Option<Invitation>, DomainError>;

    /// At most one invitation matches a hash.
    async fn find_by_token_hash(&self, hash: &TokenHash) -> Result<Option<Invitation>, DomainError>;

    /// Atomically moves a `Sent` invitation to `Used`.
    ///
    /// Returns the updated invitation, or `None` if it was no longer `Sent`.
    ///
    /// # Errors
    ///
    /// - `InvitationNotFound` if no invitation has this id
    async fn mark_used(
        &self,
        id: &InvitationId,
        member_id: &MemberId,
        used_at: Timestamp,
    ) -> Result<Option<Invitation>, DomainError>;

    /// Atomically moves a `Sent` invitation to `Expired`.
    ///
    /// Returns `false` if it was no longer `Sent`.
    async fn mark_expired(&self, id: &InvitationId) -> Result<bool, DomainError>;

    /// Flips every `Sent` invitation with `expires_at <= now` to `Expired`.
    ///
    /// Returns the number of invitations changed.
    async fn expire_sent_before(&self, now: Timestamp) -> Result<u64, DomainError>;

    /// All invitations, newest first.
    async fn list_all(&self) -> Result<Vec<Invitation>, DomainError>;
}
