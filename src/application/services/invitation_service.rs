//! InvitationService - issues and redeems single-use onboarding tokens.
//!
//! Redemption order: the member is created (or located) and moved out of
//! `Invited` before the invitation is marked used. A crash in between leaves
//! a redeemable token pointing at an existing member, never a used token
//! without a member.

use std::sync::Arc;

use crate::domain::foundation::{AdminId, Email, InvitationId, MemberId, Timestamp};
use crate::domain::invitation::{
    Invitation, InvitationStatus, InvitationToken, TokenRejection,
};
use crate::domain::member::{Member, MemberStatus};
use crate::domain::ClubError;
use crate::ports::InvitationRepository;

use super::{CreateMemberCommand, MemberRegistry};

/// Default validity window.
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

/// Command to issue an invitation.
#[derive(Debug, Clone)]
pub struct CreateInvitationCommand {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_by: AdminId,
    /// Set when inviting an already-existing member record.
    pub member_id: Option<MemberId>,
}

/// A freshly issued invitation and its raw token.
///
/// The token is only available here; storage keeps the hash.
#[derive(Debug)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub token: InvitationToken,
}

/// Names supplied by the invitee at redemption; invitation hints fill gaps.
#[derive(Debug, Clone, Default)]
pub struct RedeemCommand {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Result of a successful redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub invitation: Invitation,
    pub member: Member,
}

pub struct InvitationService {
    invitations: Arc<dyn InvitationRepository>,
    members: Arc<MemberRegistry>,
    validity_days: i64,
}

impl InvitationService {
    pub fn new(
        invitations: Arc<dyn InvitationRepository>,
        members: Arc<MemberRegistry>,
        validity_days: i64,
    ) -> Self {
        Self {
            invitations,
            members,
            validity_days,
        }
    }

    /// Issues a `Sent` invitation valid for the configured window.
    pub async fn create_invitation(
        &self,
        cmd: CreateInvitationCommand,
    ) -> Result<IssuedInvitation, ClubError> {
        let email = Email::parse(&cmd.email)?;
        if let Some(member_id) = &cmd.member_id {
            self.members.get_by_id(member_id).await?;
        }

        let (invitation, token) = Invitation::issue(
            email,
            cmd.first_name,
            cmd.last_name,
            cmd.created_by,
            cmd.member_id,
            self.validity_days,
            Timestamp::now(),
        );
        self.invitations.insert(&invitation).await?;

        tracing::info!(
            invitation_id = %invitation.id,
            created_by = %invitation.created_by,
            expires_at = %invitation.expires_at,
            "Invitation created"
        );
        Ok(IssuedInvitation { invitation, token })
    }

    /// Checks a presented token without consuming it.
    pub async fn validate_token(&self, token: &InvitationToken) -> Result<Invitation, ClubError> {
        self.validate_token_at(token, Timestamp::now()).await
    }

    /// As [`validate_token`](Self::validate_token), evaluated at `now`.
    ///
    /// A `Sent` invitation found past its expiry is flipped to `Expired`.
    pub async fn validate_token_at(
        &self,
        token: &InvitationToken,
        now: Timestamp,
    ) -> Result<Invitation, ClubError> {
        let hash = token.hash();
        let invitation = self
            .invitations
            .find_by_token_hash(&hash)
            .await?
            .ok_or_else(|| ClubError::not_found("invitation", "token"))?;
        self.check(invitation, now).await
    }

    /// Marks a `Sent` invitation used by `member_id`.
    pub async fn mark_used(
        &self,
        invitation_id: &InvitationId,
        member_id: &MemberId,
    ) -> Result<Invitation, ClubError> {
        let invitation = self
            .invitations
            .find_by_id(invitation_id)
            .await?
            .ok_or_else(|| ClubError::not_found("invitation", invitation_id))?;
        let now = Timestamp::now();
        let invitation = self.check(invitation, now).await?;
        self.consume(&invitation.id, member_id, now).await
    }

    /// Redeems a token: creates or locates the member, then consumes the token.
    pub async fn redeem(
        &self,
        token: &InvitationToken,
        cmd: RedeemCommand,
    ) -> Result<Redemption, ClubError> {
        self.redeem_at(token, cmd, Timestamp::now()).await
    }

    pub async fn redeem_at(
        &self,
        token: &InvitationToken,
        cmd: RedeemCommand,
        now: Timestamp,
    ) -> Result<Redemption, ClubError> {
        let invitation = self.validate_token_at(token, now).await?;

        let member = self.member_for(&invitation, cmd).await?;
        let member = if member.status == MemberStatus::Invited {
            self.members
                .update_status(&member.id, MemberStatus::PendingProfile)
                .await?
        } else {
            member
        };

        let invitation = self.consume(&invitation.id, &member.id, now).await?;
        tracing::info!(
            invitation_id = %invitation.id,
            member_id = %member.id,
            "Invitation redeemed"
        );
        Ok(Redemption { invitation, member })
    }

    /// Flips every overdue `Sent` invitation to `Expired`.
    pub async fn expire_old_invitations(&self) -> Result<u64, ClubError> {
        self.expire_old_invitations_at(Timestamp::now()).await
    }

    pub async fn expire_old_invitations_at(&self, now: Timestamp) -> Result<u64, ClubError> {
        let count = self.invitations.expire_sent_before(now).await?;
        if count > 0 {
            tracing::info!(count, "Expired old invitations");
        }
        Ok(count)
    }

    /// All invitations, newest first.
    pub async fn list_invitations(&self) -> Result<Vec<Invitation>, ClubError> {
        Ok(self.invitations.list_all().await?)
    }

    async fn check(&self, invitation: Invitation, now: Timestamp) -> Result<Invitation, ClubError> {
        match invitation.check_redeemable(now) {
            Ok(()) => Ok(invitation),
            Err(TokenRejection::AlreadyUsed) => Err(ClubError::AlreadyUsed),
            Err(TokenRejection::Expired { stale }) => {
                if stale && self.invitations.mark_expired(&invitation.id).await? {
                    tracing::info!(invitation_id = %invitation.id, "Invitation expired on validation");
                }
                Err(ClubError::Expired)
            }
        }
    }

    async fn consume(
        &self,
        invitation_id: &InvitationId,
        member_id: &MemberId,
        now: Timestamp,
    ) -> Result<Invitation, ClubError> {
        if let Some(used) = self.invitations.mark_used(invitation_id, member_id, now).await? {
            return Ok(used);
        }
        tracing::warn!(invitation_id = %invitation_id, "Invitation consumed concurrently");
        let current = self
            .invitations
            .find_by_id(invitation_id)
            .await?
            .ok_or_else(|| ClubError::not_found("invitation", invitation_id))?;
        Err(match current.status {
            InvitationStatus::Expired => ClubError::Expired,
            _ => ClubError::AlreadyUsed,
        })
    }

    async fn member_for(&self, invitation: &Invitation, cmd: RedeemCommand) -> Result<Member, ClubError> {
        if let Some(member_id) = &invitation.member_id {
            return self.members.get_by_id(member_id).await;
        }
        if let Some(member) = self.members.find_by_email(&invitation.email).await? {
            return Ok(member);
        }

        let create = CreateMemberCommand {
            email: invitation.email.to_string(),
            first_name: cmd
                .first_name
                .or_else(|| invitation.first_name.clone())
                .unwrap_or_default(),
            last_name: cmd
                .last_name
                .or_else(|| invitation.last_name.clone())
                .unwrap_or_default(),
            status: Some(MemberStatus::Invited),
            is_admin: false,
        };
        match self.members.create_member(create).await {
            Ok(member) => Ok(member),
            // Another redemption for the same email created it first.
            Err(ClubError::Conflict { .. }) => self.members.get_by_email(invitation.email.as_str()).await,
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        members: Arc<MemberRegistry>,
        service: InvitationService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let members = Arc::new(MemberRegistry::new(store.clone()));
        let service = InvitationService::new(store.clone(), members.clone(), DEFAULT_VALIDITY_DAYS);
        Fixture {
            store,
            members,
            service,
        }
    }

    fn invite(email: &str) -> CreateInvitationCommand {
        CreateInvitationCommand {
            email: email.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            created_by: AdminId::new("admin_1").unwrap(),
            member_id: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Issue and validate
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_invitation_stores_only_the_hash() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("A@X.org")).await.unwrap();

        assert_eq!(issued.invitation.status, InvitationStatus::Sent);
        assert_eq!(issued.invitation.email.as_str(), "a@x.org");
        assert_ne!(issued.invitation.token_hash.as_str(), issued.token.expose());
        assert_eq!(
            issued.invitation.expires_at,
            issued.invitation.created_at.add_days(DEFAULT_VALIDITY_DAYS)
        );
    }

    #[tokio::test]
    async fn validate_finds_invitation_by_token() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();

        let found = f.service.validate_token(&issued.token).await.unwrap();

        assert_eq!(found.id, issued.invitation.id);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .validate_token(&InvitationToken::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ClubError::NotFound { entity: "invitation", .. }));
    }

    #[tokio::test]
    async fn validation_at_expiry_is_expired_and_flips_status() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();
        let expires_at = issued.invitation.expires_at;

        assert!(f
            .service
            .validate_token_at(&issued.token, expires_at.plus_secs(-1))
            .await
            .is_ok());
        let err = f
            .service
            .validate_token_at(&issued.token, expires_at)
            .await
            .unwrap_err();

        assert_eq!(err, ClubError::Expired);
        let stored = f.service.list_invitations().await.unwrap();
        assert_eq!(stored[0].status, InvitationStatus::Expired);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Redemption
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn redeem_creates_member_then_consumes_token() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();

        let redemption = f
            .service
            .redeem(&issued.token, RedeemCommand::default())
            .await
            .unwrap();

        assert_eq!(redemption.member.status, MemberStatus::PendingProfile);
        assert_eq!(redemption.member.first_name, "Ada");
        assert_eq!(redemption.invitation.status, InvitationStatus::Used);
        assert_eq!(redemption.invitation.member_id, Some(redemption.member.id));
    }

    #[tokio::test]
    async fn second_redemption_is_already_used() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();
        f.service
            .redeem(&issued.token, RedeemCommand::default())
            .await
            .unwrap();

        let err = f
            .service
            .redeem(&issued.token, RedeemCommand::default())
            .await
            .unwrap_err();

        assert_eq!(err, ClubError::AlreadyUsed);
        assert_eq!(
            f.service.validate_token(&issued.token).await.unwrap_err(),
            ClubError::AlreadyUsed
        );
        assert_eq!(f.members.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn redeem_attaches_to_existing_member() {
        let f = fixture();
        let existing = f
            .members
            .create_member(CreateMemberCommand {
                email: "a@x.org".to_string(),
                first_name: "Ada".to_string(),
                last_name: "L".to_string(),
                status: None,
                is_admin: false,
            })
            .await
            .unwrap();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();

        let redemption = f
            .service
            .redeem(&issued.token, RedeemCommand::default())
            .await
            .unwrap();

        assert_eq!(redemption.member.id, existing.id);
        assert_eq!(redemption.member.status, MemberStatus::PendingProfile);
    }

    #[tokio::test]
    async fn failed_member_write_leaves_token_redeemable() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();
        f.store.fail_member_writes(true);

        assert!(f
            .service
            .redeem(&issued.token, RedeemCommand::default())
            .await
            .is_err());

        f.store.fail_member_writes(false);
        assert_eq!(
            f.service.validate_token(&issued.token).await.unwrap().status,
            InvitationStatus::Sent
        );
    }

    #[tokio::test]
    async fn mark_used_after_expiry_is_expired() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();
        f.service
            .expire_old_invitations_at(issued.invitation.expires_at)
            .await
            .unwrap();

        let err = f
            .service
            .mark_used(&issued.invitation.id, &MemberId::new())
            .await
            .unwrap_err();

        assert_eq!(err, ClubError::Expired);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Sweep
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let f = fixture();
        let issued = f.service.create_invitation(invite("a@x.org")).await.unwrap();
        f.service.create_invitation(invite("b@x.org")).await.unwrap();
        let later = issued.invitation.expires_at.add_days(1);

        assert_eq!(f.service.expire_old_invitations_at(later).await.unwrap(), 2);
        assert_eq!(f.service.expire_old_invitations_at(later).await.unwrap(), 0);
        assert_eq!(f.service.expire_old_invitations().await.unwrap(), 0);
    }
}
