//! Invitation aggregate entity.
//!
//! An invitation is a single-use, time-boxed onboarding credential. The raw
//! secret leaves this module exactly once, from [`Invitation::issue`].

use crate::domain::foundation::{
    AdminId, DomainError, Email, ErrorCode, InvitationId, MemberId, StateMachine, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::{InvitationStatus, InvitationToken, TokenHash};

/// Why a presented token cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    AlreadyUsed,

    /// `stale` is true when the stored status is still `Sent` and should be
    /// flipped to `Expired`.
    Expired { stale: bool },
}

/// Invitation aggregate.
///
/// # Invariants
///
/// - only `token_hash` is stored, never the raw token
/// - `expires_at = created_at + validity window`
/// - once `Used` or `Expired`, the status never changes again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub token_hash: TokenHash,
    pub status: InvitationStatus,
    pub member_id: Option<MemberId>,
    pub created_by: AdminId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
}

impl Invitation {
    /// Issues a new `Sent` invitation and the raw token that redeems it.
    pub fn issue(
        email: Email,
        first_name: Option<String>,
        last_name: Option<String>,
        created_by: AdminId,
        member_id: Option<MemberId>,
        validity_days: i64,
        now: Timestamp,
    ) -> (Self, InvitationToken) {
        let token = InvitationToken::generate();
        let invitation = Self {
            id: InvitationId::new(),
            email,
            first_name: first_name.filter(|s| !s.trim().is_empty()),
            last_name: last_name.filter(|s| !s.trim().is_empty()),
            token_hash: token.hash(),
            status: InvitationStatus::Sent,
            member_id,
            created_by,
            created_at: now,
            expires_at: now.add_days(validity_days),
            used_at: None,
        };
        (invitation, token)
    }

    /// Expiry is inclusive: a token presented at exactly `expires_at` is expired.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Checks whether this invitation can be redeemed at `now`.
    pub fn check_redeemable(&self, now: Timestamp) -> Result<(), TokenRejection> {
        match self.status {
            InvitationStatus::Used => Err(TokenRejection::AlreadyUsed),
            InvitationStatus::Expired => Err(TokenRejection::Expired { stale: false }),
            InvitationStatus::Sent if self.is_expired_at(now) => {
                Err(TokenRejection::Expired { stale: true })
            }
            InvitationStatus::Sent => Ok(()),
        }
    }

    /// Marks the invitation used by `member_id`.
    pub fn mark_used(&mut self, member_id: MemberId, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(InvitationStatus::Used)?;
        self.member_id = Some(member_id);
        self.used_at = Some(now);
        Ok(())
    }

    pub fn mark_expired(&mut self) -> Result<(), DomainError> {
        self.transition_to(InvitationStatus::Expired)
    }

    fn transition_to(&mut self, target: InvitationStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            let code = match self.status {
                InvitationStatus::Used => ErrorCode::InvitationAlreadyUsed,
                InvitationStatus::Expired => ErrorCode::InvitationExpired,
                InvitationStatus::Sent => ErrorCode::InvalidStateTransition,
            };
            DomainError::new(
                code,
                format!("Cannot transition invitation from {} to {}", self.status, target),
            )
            .with_detail("from", self.status.as_str())
            .with_detail("to", target.as_str())
        })?;
        Ok(())
    }
}
