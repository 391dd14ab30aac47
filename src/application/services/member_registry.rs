//! MemberRegistry - owns the Member entity and its status machine.

use std::sync::Arc;

use crate::domain::foundation::{Email, MemberId, Timestamp};
use crate::domain::member::{
    advance_on_profile_complete, DuesSummary, Member, MemberStatus, ProfileUpdate,
};
use crate::domain::ClubError;
use crate::ports::MemberRepository;

/// Attempts at a status compare-and-set before giving up.
const MAX_CAS_ATTEMPTS: usize = 5;

/// Command to create a member directly (bypassing invitation).
#[derive(Debug, Clone)]
pub struct CreateMemberCommand {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Defaults to `PendingProfile`.
    pub status: Option<MemberStatus>,
    pub is_admin: bool,
}

/// Service owning member records.
///
/// Every status change goes through the transition table; a request for
/// the member's current status is a no-op.
pub struct MemberRegistry {
    members: Arc<dyn MemberRepository>,
}

impl MemberRegistry {
    pub fn new(members: Arc<dyn MemberRepository>) -> Self {
        Self { members }
    }

    /// Creates a member, rejecting duplicate emails.
    pub async fn create_member(&self, cmd: CreateMemberCommand) -> Result<Member, ClubError> {
        let email = Email::parse(&cmd.email)?;
        if self.members.find_by_email(&email).await?.is_some() {
            return Err(ClubError::conflict("member", email));
        }

        let status = cmd.status.unwrap_or(MemberStatus::PendingProfile);
        let member = Member::new(
            email,
            cmd.first_name,
            cmd.last_name,
            status,
            cmd.is_admin,
            Timestamp::now(),
        );
        self.members.insert(&member).await?;

        tracing::info!(member_id = %member.id, status = %member.status, "Member created");
        Ok(member)
    }

    /// Ensures an active admin with `email` exists, creating one if absent.
    ///
    /// An existing member is returned unchanged; promoting a non-admin is
    /// left to the operator.
    pub async fn ensure_admin(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Member, ClubError> {
        let parsed = Email::parse(email)?;
        if let Some(existing) = self.members.find_by_email(&parsed).await? {
            if !existing.is_admin || existing.status != MemberStatus::Active {
                tracing::warn!(
                    member_id = %existing.id,
                    status = %existing.status,
                    is_admin = existing.is_admin,
                    "Bootstrap admin exists but is not an active admin"
                );
            }
            return Ok(existing);
        }

        let created = self
            .create_member(CreateMemberCommand {
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                status: Some(MemberStatus::Active),
                is_admin: true,
            })
            .await;
        match created {
            Ok(member) => Ok(member),
            // Another instance bootstrapped concurrently.
            Err(ClubError::Conflict { .. }) => self.get_by_email(email).await,
            Err(err) => Err(err),
        }
    }

    /// Writes profile fields and applies the profile-complete transition.
    pub async fn update_profile(
        &self,
        member_id: &MemberId,
        update: ProfileUpdate,
    ) -> Result<Member, ClubError> {
        if update.is_empty() {
            return self.get_by_id(member_id).await;
        }

        let member = self
            .modify(member_id, |member, now| {
                let advance = advance_on_profile_complete(member, &update);
                member.apply_profile_update(&update, now);
                if let Some(target) = advance {
                    member.complete_profile(target, now)?;
                }
                Ok(true)
            })
            .await?;

        tracing::info!(member_id = %member.id, status = %member.status, "Profile updated");
        Ok(member)
    }

    /// Moves a member to `target` along the transition table.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the member doesn't exist
    /// - `IllegalTransition` if the table forbids the move
    pub async fn update_status(
        &self,
        member_id: &MemberId,
        target: MemberStatus,
    ) -> Result<Member, ClubError> {
        let mut from = None;
        let member = self
            .modify(member_id, |member, now| {
                from = Some(member.status);
                Ok(member.transition_to(target, now)?)
            })
            .await?;

        if from != Some(target) {
            tracing::info!(
                member_id = %member_id,
                from = ?from,
                to = %target,
                "Member status changed"
            );
        }
        Ok(member)
    }

    /// Replaces the cached dues summary on the member record.
    pub async fn refresh_dues_summary(
        &self,
        member_id: &MemberId,
        summary: DuesSummary,
    ) -> Result<(), ClubError> {
        self.modify(member_id, |member, now| {
            member.refresh_dues_summary(summary.clone(), now);
            Ok(true)
        })
        .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, member_id: &MemberId) -> Result<Member, ClubError> {
        self.members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| ClubError::not_found("member", member_id))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Member, ClubError> {
        let email = Email::parse(email)?;
        self.members
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ClubError::not_found("member", email))
    }

    /// Looks up a member by email, returning `None` if absent.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Member>, ClubError> {
        Ok(self.members.find_by_email(email).await?)
    }

    pub async fn list_by_status(&self, status: MemberStatus) -> Result<Vec<Member>, ClubError> {
        Ok(self.members.list_by_status(status).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Member>, ClubError> {
        Ok(self.members.list_all().await?)
    }

    /// Read-modify-write guarded by a compare-and-set on the member version.
    ///
    /// `change` returns `false` when it left the member untouched, in which
    /// case nothing is written.
    async fn modify<F>(&self, member_id: &MemberId, mut change: F) -> Result<Member, ClubError>
    where
        F: FnMut(&mut Member, Timestamp) -> Result<bool, ClubError> + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut member = self.get_by_id(member_id).await?;
            let expected = member.version;
            if !change(&mut member, Timestamp::now())? {
                return Ok(member);
            }
            member.version = expected + 1;
            if self.members.update_if_version(&member, expected).await? {
                return Ok(member);
            }
            tracing::warn!(member_id = %member_id, attempt, "Concurrent member update, retrying");
        }
        Err(ClubError::store_unavailable(format!(
            "member {} kept changing during update",
            member_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::{Currency, CycleId, DomainError, Money};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    fn registry() -> MemberRegistry {
        MemberRegistry::new(Arc::new(InMemoryStore::new()))
    }

    /// Makes the first two `find_by_id` calls wait for each other, so both
    /// writers read the same version.
    struct PairedReads {
        inner: Arc<InMemoryStore>,
        reads: AtomicUsize,
        meet: Barrier,
    }

    #[async_trait]
    impl MemberRepository for PairedReads {
        async fn insert(&self, member: &Member) -> Result<(), DomainError> {
            self.inner.insert(member).await
        }

        async fn update_if_version(&self, member: &Member, expected: i64) -> Result<bool, DomainError> {
            self.inner.update_if_version(member, expected).await
        }

        async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError> {
            let found = self.inner.find_by_id(id).await;
            if self.reads.fetch_add(1, Ordering::SeqCst) < 2 {
                self.meet.wait().await;
            }
            found
        }

        async fn find_by_email(&self, email: &Email) -> Result<Option<Member>, DomainError> {
            self.inner.find_by_email(email).await
        }

        async fn list_by_status(&self, status: MemberStatus) -> Result<Vec<Member>, DomainError> {
            self.inner.list_by_status(status).await
        }

        async fn list_all(&self) -> Result<Vec<Member>, DomainError> {
            self.inner.list_all().await
        }
    }

    fn create(email: &str) -> CreateMemberCommand {
        CreateMemberCommand {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            status: None,
            is_admin: false,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Creation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn create_defaults_to_pending_profile() {
        let member = registry().create_member(create("ada@x.org")).await.unwrap();
        assert_eq!(member.status, MemberStatus::PendingProfile);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict_case_insensitive() {
        let registry = registry();
        registry.create_member(create("ada@x.org")).await.unwrap();

        let err = registry.create_member(create("ADA@x.org")).await.unwrap_err();

        assert!(matches!(err, ClubError::Conflict { entity: "member", .. }));
    }

    #[tokio::test]
    async fn invalid_email_is_validation_error() {
        let err = registry().create_member(create("not-an-email")).await.unwrap_err();
        assert!(matches!(err, ClubError::ValidationFailed { ref field, .. } if field == "email"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Profile
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn profile_with_bio_advances_to_pending_payment() {
        let registry = registry();
        let member = registry.create_member(create("ada@x.org")).await.unwrap();

        let updated = registry
            .update_profile(
                &member.id,
                ProfileUpdate {
                    bio: Some("Mathematician".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, MemberStatus::PendingPayment);
        assert!(updated.profile_completed_at.is_some());
        assert_eq!(updated.profile.bio.as_deref(), Some("Mathematician"));
    }

    #[tokio::test]
    async fn profile_without_name_or_bio_keeps_status() {
        let registry = registry();
        let member = registry.create_member(create("ada@x.org")).await.unwrap();

        let updated = registry
            .update_profile(
                &member.id,
                ProfileUpdate {
                    company: Some("Engines Ltd".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, MemberStatus::PendingProfile);
        assert_eq!(updated.profile.company.as_deref(), Some("Engines Ltd"));
    }

    #[tokio::test]
    async fn profile_update_on_active_member_never_changes_status() {
        let registry = registry();
        let mut cmd = create("ada@x.org");
        cmd.status = Some(MemberStatus::Active);
        let member = registry.create_member(cmd).await.unwrap();

        let updated = registry
            .update_profile(
                &member.id,
                ProfileUpdate {
                    full_name: Some("Ada King".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, MemberStatus::Active);
        assert_eq!(updated.full_name, "Ada King");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Status
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn illegal_transition_is_rejected_and_not_written() {
        let registry = registry();
        let member = registry.create_member(create("ada@x.org")).await.unwrap();

        let err = registry
            .update_status(&member.id, MemberStatus::Active)
            .await
            .unwrap_err();

        assert_eq!(err, ClubError::illegal_transition("pending_profile", "active"));
        assert_eq!(
            registry.get_by_id(&member.id).await.unwrap().status,
            MemberStatus::PendingProfile
        );
    }

    #[tokio::test]
    async fn same_status_is_noop() {
        let registry = registry();
        let member = registry.create_member(create("ada@x.org")).await.unwrap();

        let again = registry
            .update_status(&member.id, MemberStatus::PendingProfile)
            .await
            .unwrap();

        assert_eq!(again.updated_at, member.updated_at);
    }

    #[tokio::test]
    async fn deactivate_and_reactivate() {
        let registry = registry();
        let mut cmd = create("ada@x.org");
        cmd.status = Some(MemberStatus::Active);
        let member = registry.create_member(cmd).await.unwrap();

        registry.update_status(&member.id, MemberStatus::Inactive).await.unwrap();
        let back = registry.update_status(&member.id, MemberStatus::PendingPayment).await.unwrap();

        assert_eq!(back.status, MemberStatus::PendingPayment);
    }

    #[tokio::test]
    async fn unknown_member_is_not_found() {
        let err = registry()
            .update_status(&MemberId::new(), MemberStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, ClubError::NotFound { entity: "member", .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Admin bootstrap
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn ensure_admin_creates_active_admin_once() {
        let registry = registry();

        let first = registry.ensure_admin("root@x.org", "Root", "Admin").await.unwrap();
        let again = registry.ensure_admin("ROOT@x.org", "Other", "Name").await.unwrap();

        assert!(first.is_admin);
        assert_eq!(first.status, MemberStatus::Active);
        assert_eq!(again.id, first.id);
        assert_eq!(registry.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ensure_admin_leaves_existing_member_alone() {
        let registry = registry();
        let member = registry.create_member(create("ada@x.org")).await.unwrap();

        let found = registry.ensure_admin("ada@x.org", "Ada", "L").await.unwrap();

        assert_eq!(found, member);
        assert!(!found.is_admin);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Concurrent writes
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_profile_and_summary_writes_both_land() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = MemberRegistry::new(store.clone());
        let mut cmd = create("ada@x.org");
        cmd.status = Some(MemberStatus::Active);
        let member = seeded.create_member(cmd).await.unwrap();

        let registry = Arc::new(MemberRegistry::new(Arc::new(PairedReads {
            inner: store.clone(),
            reads: AtomicUsize::new(0),
            meet: Barrier::new(2),
        })));
        let summary = DuesSummary {
            cycle_id: CycleId::for_ending_year(2026),
            amount: Money::new(8500, Currency::usd()).unwrap(),
            paid: true,
            paid_at: Some(Timestamp::now()),
            payment_ref: None,
        };

        let profile = {
            let registry = registry.clone();
            let id = member.id;
            tokio::spawn(async move {
                registry
                    .update_profile(
                        &id,
                        ProfileUpdate {
                            bio: Some("Hello".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };
        let dues = {
            let registry = registry.clone();
            let id = member.id;
            tokio::spawn(async move { registry.refresh_dues_summary(&id, summary).await })
        };
        profile.await.unwrap().unwrap();
        dues.await.unwrap().unwrap();

        let stored = seeded.get_by_id(&member.id).await.unwrap();
        assert_eq!(stored.profile.bio.as_deref(), Some("Hello"));
        assert!(stored.dues_summary.is_some_and(|s| s.paid));
        assert_eq!(stored.version, 2);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn list_by_status_filters() {
        let registry = registry();
        registry.create_member(create("a@x.org")).await.unwrap();
        let mut active = create("b@x.org");
        active.status = Some(MemberStatus::Active);
        registry.create_member(active).await.unwrap();

        let found = registry.list_by_status(MemberStatus::Active).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email.as_str(), "b@x.org");
        assert_eq!(registry.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_by_email_is_case_insensitive() {
        let registry = registry();
        registry.create_member(create("ada@x.org")).await.unwrap();

        assert!(registry.get_by_email("Ada@X.ORG").await.is_ok());
        assert!(matches!(
            registry.get_by_email("nobody@x.org").await,
            Err(ClubError::NotFound { .. })
        ));
    }
}
