//! End-to-end service flows over the in-memory store.
//!
//! Covers the onboarding path from invitation to active member, the
//! settlement paths (gateway, offline, waiver) and the operations that
//! must hold up under concurrent callers.

mod common;

use club_dues::application::services::{CreateInvitationCommand, CreatePaymentCommand, RedeemCommand};
use club_dues::domain::dues::{DuesStatus, PaymentStatus};
use club_dues::domain::foundation::{CycleId, GatewaySessionId, MemberId, Timestamp};
use club_dues::domain::invitation::{InvitationStatus, InvitationToken};
use club_dues::domain::member::{MemberStatus, ProfileUpdate};
use club_dues::domain::ClubError;

use common::{active_cycle, admin, member, services};

fn invite(email: &str) -> CreateInvitationCommand {
    CreateInvitationCommand {
        email: email.to_string(),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        created_by: admin(),
        member_id: None,
    }
}

fn payment(member_id: MemberId, cycle_id: &CycleId, session: &str) -> CreatePaymentCommand {
    CreatePaymentCommand {
        member_id,
        cycle_id: Some(cycle_id.clone()),
        email: "a@x.org".to_string(),
        gateway_session_id: session.to_string(),
        amount_cents: 8500,
        currency: "USD".to_string(),
        description: Some("Annual dues".to_string()),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cycles
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn activated_cycle_is_the_only_active_one() {
    let services = services();
    let old = active_cycle(&services, 2025).await;
    let cycle = active_cycle(&services, 2026).await;

    let active = services.cycles.get_active_cycle().await.unwrap().unwrap();
    let all = services.cycles.list_all().await.unwrap();

    assert_eq!(active.id, cycle.id);
    assert_eq!(active.amount.amount_cents, 8500);
    assert_eq!(all.iter().filter(|c| c.is_active).count(), 1);
    assert!(!services.cycles.get_by_id(&old.id).await.unwrap().is_active);
}

#[tokio::test]
async fn deactivating_leaves_no_active_cycle() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;

    services.cycles.deactivate_cycle(&cycle.id).await.unwrap();

    assert!(services.cycles.get_active_cycle().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_activations_settle_on_one_active_cycle() {
    let services = services();
    let mut ids = Vec::new();
    for year in 2020..2028 {
        ids.push(active_cycle(&services, year).await.id);
    }

    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let services = services.clone();
            tokio::spawn(async move { services.cycles.activate_cycle(&id).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let all = services.cycles.list_all().await.unwrap();
    assert_eq!(all.iter().filter(|c| c.is_active).count(), 1);
}

// ════════════════════════════════════════════════════════════════════════════
// Invitations
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn invitation_redeems_once() {
    let services = services();
    let issued = services.invitations.create_invitation(invite("a@x.org")).await.unwrap();
    let raw = InvitationToken::from_raw(issued.token.expose());

    services.invitations.validate_token(&raw).await.unwrap();
    let redemption = services
        .invitations
        .redeem(&raw, RedeemCommand::default())
        .await
        .unwrap();

    assert_eq!(redemption.invitation.status, InvitationStatus::Used);
    assert_eq!(redemption.invitation.member_id, Some(redemption.member.id));
    assert!(matches!(
        redemption.member.status,
        MemberStatus::Invited | MemberStatus::PendingProfile
    ));

    let err = services
        .invitations
        .redeem(&raw, RedeemCommand::default())
        .await
        .unwrap_err();
    assert_eq!(err, ClubError::AlreadyUsed);
    assert_eq!(services.members.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let services = services();
    let err = services
        .invitations
        .validate_token(&InvitationToken::from_raw("no-such-token"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClubError::NotFound { entity: "invitation", .. }));
}

#[tokio::test]
async fn token_expires_exactly_at_expiry() {
    let services = services();
    let issued = services.invitations.create_invitation(invite("a@x.org")).await.unwrap();
    let expires_at = issued.invitation.expires_at;

    services
        .invitations
        .validate_token_at(&issued.token, expires_at.plus_secs(-1))
        .await
        .unwrap();
    let err = services
        .invitations
        .validate_token_at(&issued.token, expires_at)
        .await
        .unwrap_err();

    assert_eq!(err, ClubError::Expired);
    let stored = services.invitations.list_invitations().await.unwrap();
    assert_eq!(stored[0].status, InvitationStatus::Expired);
}

#[tokio::test]
async fn expiry_sweep_is_idempotent() {
    let services = services();
    services.invitations.create_invitation(invite("a@x.org")).await.unwrap();
    services.invitations.create_invitation(invite("b@x.org")).await.unwrap();
    let later = Timestamp::now().add_days(8);

    assert_eq!(services.invitations.expire_old_invitations_at(later).await.unwrap(), 2);
    assert_eq!(services.invitations.expire_old_invitations_at(later).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_consume_token_once() {
    let services = services();
    let issued = services.invitations.create_invitation(invite("a@x.org")).await.unwrap();
    let raw = issued.token.expose().to_string();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let services = services.clone();
            let raw = raw.clone();
            tokio::spawn(async move {
                services
                    .invitations
                    .redeem(&InvitationToken::from_raw(raw), RedeemCommand::default())
                    .await
            })
        })
        .collect();
    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == ClubError::AlreadyUsed));
    assert_eq!(services.members.list_all().await.unwrap().len(), 1);
}

// ════════════════════════════════════════════════════════════════════════════
// Payments and reconciliation
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn duplicate_reconcile_is_a_no_op() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let m = member(&services, "a@x.org", MemberStatus::PendingPayment).await;
    services.ledger.create_payment(payment(m.id, &cycle.id, "sess_1")).await.unwrap();
    let session = GatewaySessionId::new("sess_1").unwrap();

    let first = services.ledger.reconcile(&session, None).await.unwrap().unwrap();
    let dues_after_first = services.ledger.get_member_dues(&m.id, &cycle.id).await.unwrap();
    let second = services.ledger.reconcile(&session, None).await.unwrap().unwrap();
    let dues_after_second = services.ledger.get_member_dues(&m.id, &cycle.id).await.unwrap();

    assert!(first.applied);
    assert!(!second.applied);
    assert_eq!(first.payment, second.payment);
    assert_eq!(second.payment.status, PaymentStatus::Paid);
    assert_eq!(dues_after_first.status, DuesStatus::Paid);
    assert_eq!(dues_after_first, dues_after_second);
    assert_eq!(
        services.members.get_by_id(&m.id).await.unwrap().status,
        MemberStatus::Active
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reconciles_apply_once() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let m = member(&services, "a@x.org", MemberStatus::PendingPayment).await;
    services.ledger.create_payment(payment(m.id, &cycle.id, "sess_race")).await.unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let services = services.clone();
            tokio::spawn(async move {
                let session = GatewaySessionId::new("sess_race").unwrap();
                services.ledger.reconcile(&session, Some("pi_1".to_string())).await
            })
        })
        .collect();
    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.applied).count(), 1);
    let member = services.members.get_by_id(&m.id).await.unwrap();
    assert_eq!(member.status, MemberStatus::Active);
    assert!(member.dues_summary.is_some_and(|s| s.paid));
}

#[tokio::test]
async fn reconcile_of_unknown_session_is_none() {
    let services = services();
    let session = GatewaySessionId::new("sess_unknown").unwrap();

    assert!(services.ledger.reconcile(&session, None).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_payment_cannot_be_reconciled() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let m = member(&services, "a@x.org", MemberStatus::PendingPayment).await;
    services.ledger.create_payment(payment(m.id, &cycle.id, "sess_f")).await.unwrap();
    let session = GatewaySessionId::new("sess_f").unwrap();

    let failed = services.ledger.record_failure(&session).await.unwrap().unwrap();
    let after = services.ledger.reconcile(&session, None).await.unwrap().unwrap();

    assert_eq!(failed.status, PaymentStatus::Failed);
    assert!(!after.applied);
    assert_eq!(after.payment.status, PaymentStatus::Failed);
    assert_eq!(
        services.members.get_by_id(&m.id).await.unwrap().status,
        MemberStatus::PendingPayment
    );
}

// ════════════════════════════════════════════════════════════════════════════
// Admin settlement
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn waive_overwrites_offline_payment() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let m = member(&services, "a@x.org", MemberStatus::PendingPayment).await;

    let offline = services
        .ledger
        .mark_paid_offline(&m.id, &cycle.id, admin(), Some("cash".to_string()))
        .await
        .unwrap();
    assert_eq!(offline.status, DuesStatus::PaidOffline);
    assert!(offline.paid_offline_at.is_some());

    let waived = services
        .ledger
        .waive(&m.id, &cycle.id, admin(), "hardship")
        .await
        .unwrap();
    assert_eq!(waived.status, DuesStatus::Waived);
    assert!(waived.waived_at.is_some());
    assert_eq!(
        services.ledger.get_member_dues(&m.id, &cycle.id).await.unwrap().status,
        DuesStatus::Waived
    );
}

#[tokio::test]
async fn overdue_view_lists_unsettled_members_past_grace() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let unpaid = member(&services, "a@x.org", MemberStatus::PendingPayment).await;
    let paid = member(&services, "b@x.org", MemberStatus::PendingPayment).await;
    services
        .ledger
        .mark_paid_offline(&paid.id, &cycle.id, admin(), None)
        .await
        .unwrap();

    let before = services
        .ledger
        .list_overdue(&cycle.id, cycle.grace_deadline())
        .await
        .unwrap();
    let after = services
        .ledger
        .list_overdue(&cycle.id, cycle.grace_deadline().plus_secs(1))
        .await
        .unwrap();

    assert!(before.is_empty());
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].member_id, unpaid.id);
}

// ════════════════════════════════════════════════════════════════════════════
// Onboarding end to end
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn invitation_to_active_member() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let issued = services.invitations.create_invitation(invite("new@x.org")).await.unwrap();

    let redemption = services
        .invitations
        .redeem(&issued.token, RedeemCommand::default())
        .await
        .unwrap();
    let m = redemption.member;
    assert!(!services.access.check_access("new@x.org").await.unwrap().has_access);

    let m = services
        .members
        .update_profile(
            &m.id,
            ProfileUpdate {
                bio: Some("Engines".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(m.status, MemberStatus::PendingPayment);

    services.ledger.create_payment(payment(m.id, &cycle.id, "sess_new")).await.unwrap();
    services
        .ledger
        .reconcile(&GatewaySessionId::new("sess_new").unwrap(), None)
        .await
        .unwrap();

    let decision = services.access.check_access("NEW@x.org").await.unwrap();
    assert!(decision.has_access);
    assert!(!services.access.is_admin("new@x.org").await.unwrap());
}

#[tokio::test]
async fn reactivation_respects_settled_dues() {
    let services = services();
    let cycle = active_cycle(&services, 2026).await;
    let settled = member(&services, "a@x.org", MemberStatus::Inactive).await;
    let unsettled = member(&services, "b@x.org", MemberStatus::Inactive).await;
    services
        .ledger
        .waive(&settled.id, &cycle.id, admin(), "board")
        .await
        .unwrap();

    let a = services.ledger.reactivate_member(&settled.id, admin()).await.unwrap();
    let b = services.ledger.reactivate_member(&unsettled.id, admin()).await.unwrap();

    assert_eq!(a.status, MemberStatus::Active);
    assert_eq!(b.status, MemberStatus::PendingPayment);
    let err = services.ledger.reactivate_member(&a.id, admin()).await.unwrap_err();
    assert!(matches!(err, ClubError::IllegalTransition { .. }));
}
