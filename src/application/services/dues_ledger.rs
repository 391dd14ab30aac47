//! DuesLedger - per-member dues, payment records, and reconciliation.
//!
//! # Reconciliation
//!
//! Gateways deliver webhooks at least once. `reconcile` is safe to call any
//! number of times for the same session:
//!
//! 1. Unknown session: `Ok(None)`, nothing written.
//! 2. Pending: compare-and-set to `Paid`. The winner runs the side effects;
//!    a concurrent loser stops without running them.
//! 3. Already `Paid`: the side effects are re-applied idempotently, so a
//!    retry after a partial failure finishes the job without double writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::dues::{Cycle, MemberDues, Payment, PaymentOutcome, PaymentStatus};
use crate::domain::foundation::{
    AdminId, Currency, CycleId, Email, GatewaySessionId, MemberId, Money, Timestamp,
};
use crate::domain::member::{DuesSummary, Member, MemberStatus};
use crate::domain::ClubError;
use crate::ports::{MemberDuesRepository, PaymentRepository};

use super::{DuesCycleManager, MemberRegistry};

/// Command to record a checkout session as a pending payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub member_id: MemberId,
    pub cycle_id: Option<CycleId>,
    pub email: String,
    pub gateway_session_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub description: Option<String>,
}

/// Result of a reconcile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub payment: Payment,
    pub member_id: MemberId,
    pub cycle_id: Option<CycleId>,
    /// True only for the call that moved the payment out of `Pending`.
    pub applied: bool,
}

impl Reconciliation {
    fn new(payment: Payment, applied: bool) -> Self {
        Self {
            member_id: payment.member_id,
            cycle_id: payment.cycle_id.clone(),
            payment,
            applied,
        }
    }
}

/// Reconciliation engine for dues and payments.
pub struct DuesLedger {
    dues: Arc<dyn MemberDuesRepository>,
    payments: Arc<dyn PaymentRepository>,
    members: Arc<MemberRegistry>,
    cycles: Arc<DuesCycleManager>,
}

impl DuesLedger {
    pub fn new(
        dues: Arc<dyn MemberDuesRepository>,
        payments: Arc<dyn PaymentRepository>,
        members: Arc<MemberRegistry>,
        cycles: Arc<DuesCycleManager>,
    ) -> Self {
        Self {
            dues,
            payments,
            members,
            cycles,
        }
    }

    /// The stored record, or an `Unpaid` record if none was written.
    pub async fn get_member_dues(
        &self,
        member_id: &MemberId,
        cycle_id: &CycleId,
    ) -> Result<MemberDues, ClubError> {
        Ok(self
            .dues
            .find(member_id, cycle_id)
            .await?
            .unwrap_or_else(|| MemberDues::unpaid(*member_id, cycle_id.clone())))
    }

    /// Records an offline payment. Re-invoking re-stamps the record.
    pub async fn mark_paid_offline(
        &self,
        member_id: &MemberId,
        cycle_id: &CycleId,
        admin: AdminId,
        note: Option<String>,
    ) -> Result<MemberDues, ClubError> {
        let member = self.members.get_by_id(member_id).await?;
        let cycle = self.cycles.get_by_id(cycle_id).await?;

        let mut dues = self.get_member_dues(member_id, cycle_id).await?;
        dues.mark_paid_offline(admin.clone(), note, Timestamp::now());
        self.dues.upsert(&dues).await?;

        tracing::info!(
            member_id = %member_id,
            cycle_id = %cycle_id,
            admin = %admin,
            "Dues marked paid offline"
        );
        self.after_dues_write(&member, &dues, cycle.amount).await?;
        Ok(dues)
    }

    /// Waives the dues. Re-invoking re-stamps the record.
    pub async fn waive(
        &self,
        member_id: &MemberId,
        cycle_id: &CycleId,
        admin: AdminId,
        reason: &str,
    ) -> Result<MemberDues, ClubError> {
        let member = self.members.get_by_id(member_id).await?;
        let cycle = self.cycles.get_by_id(cycle_id).await?;

        let mut dues = self.get_member_dues(member_id, cycle_id).await?;
        dues.waive(admin.clone(), reason, Timestamp::now())?;
        self.dues.upsert(&dues).await?;

        tracing::info!(
            member_id = %member_id,
            cycle_id = %cycle_id,
            admin = %admin,
            "Dues waived"
        );
        self.after_dues_write(&member, &dues, cycle.amount).await?;
        Ok(dues)
    }

    /// Records a pending payment for a gateway checkout session.
    ///
    /// A repeated call for the same session and member returns the existing
    /// record; the same session for a different member is a conflict.
    pub async fn create_payment(&self, cmd: CreatePaymentCommand) -> Result<Payment, ClubError> {
        let session_id = GatewaySessionId::new(cmd.gateway_session_id)?;
        let email = Email::parse(&cmd.email)?;
        let amount = Money::new(cmd.amount_cents, Currency::parse(&cmd.currency)?)?;

        if let Some(existing) = self.payments.find_by_session(&session_id).await? {
            return Self::existing_for(existing, &cmd.member_id);
        }

        self.members.get_by_id(&cmd.member_id).await?;
        if let Some(cycle_id) = &cmd.cycle_id {
            self.cycles.get_by_id(cycle_id).await?;
        }

        let payment = Payment::pending(
            cmd.member_id,
            cmd.cycle_id,
            email,
            session_id.clone(),
            amount,
            cmd.description,
            Timestamp::now(),
        );
        match self.payments.insert(&payment).await {
            Ok(()) => {}
            Err(err) => {
                let err = ClubError::from(err);
                if !matches!(err, ClubError::Conflict { .. }) {
                    return Err(err);
                }
                // Lost a race with another checkout-initiation call.
                let existing = self
                    .payments
                    .find_by_session(&session_id)
                    .await?
                    .ok_or(err)?;
                return Self::existing_for(existing, &cmd.member_id);
            }
        }

        tracing::info!(
            payment_id = %payment.id,
            member_id = %payment.member_id,
            session_id = %payment.gateway_session_id,
            amount = %payment.amount,
            "Payment created"
        );
        Ok(payment)
    }

    /// Reconciles a successful gateway charge. See the module docs.
    ///
    /// Returns `None` for sessions this crate never recorded.
    pub async fn reconcile(
        &self,
        session_id: &GatewaySessionId,
        payment_intent_id: Option<String>,
    ) -> Result<Option<Reconciliation>, ClubError> {
        let Some(payment) = self.payments.find_by_session(session_id).await? else {
            tracing::warn!(session_id = %session_id, "Reconcile for unknown session ignored");
            return Ok(None);
        };

        match payment.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => {
                tracing::info!(session_id = %session_id, "Payment already paid, resuming");
                self.apply_settlement(&payment).await?;
                return Ok(Some(Reconciliation::new(payment, false)));
            }
            PaymentStatus::Failed | PaymentStatus::Refunded => {
                tracing::warn!(
                    session_id = %session_id,
                    status = %payment.status,
                    "Reconcile for terminal payment ignored"
                );
                return Ok(Some(Reconciliation::new(payment, false)));
            }
        }

        let outcome = PaymentOutcome::Paid {
            payment_intent_id,
            at: Timestamp::now(),
        };
        let Some(paid) = self.payments.transition_if_pending(session_id, &outcome).await? else {
            tracing::warn!(session_id = %session_id, "Concurrent reconcile won the race, stopping");
            let current = self
                .payments
                .find_by_session(session_id)
                .await?
                .ok_or_else(|| ClubError::not_found("payment", session_id))?;
            return Ok(Some(Reconciliation::new(current, false)));
        };

        tracing::info!(
            payment_id = %paid.id,
            member_id = %paid.member_id,
            session_id = %session_id,
            "Payment reconciled"
        );
        self.apply_settlement(&paid).await?;
        Ok(Some(Reconciliation::new(paid, true)))
    }

    /// Marks a pending payment failed (expired or declined checkout).
    ///
    /// Returns `None` for unknown sessions; a terminal payment is returned
    /// unchanged.
    pub async fn record_failure(
        &self,
        session_id: &GatewaySessionId,
    ) -> Result<Option<Payment>, ClubError> {
        let Some(payment) = self.payments.find_by_session(session_id).await? else {
            tracing::warn!(session_id = %session_id, "Failure for unknown session ignored");
            return Ok(None);
        };
        if !payment.is_pending() {
            return Ok(Some(payment));
        }

        let outcome = PaymentOutcome::Failed { at: Timestamp::now() };
        match self.payments.transition_if_pending(session_id, &outcome).await? {
            Some(failed) => {
                tracing::info!(session_id = %session_id, "Payment marked failed");
                Ok(Some(failed))
            }
            None => Ok(self.payments.find_by_session(session_id).await?),
        }
    }

    /// Dues for every member in `cycle_id`, defaulting absent records to `Unpaid`.
    pub async fn list_member_dues_for_cycle(
        &self,
        cycle_id: &CycleId,
    ) -> Result<BTreeMap<MemberId, MemberDues>, ClubError> {
        self.cycles.get_by_id(cycle_id).await?;
        let members = self.members.list_all().await?;
        let mut stored: BTreeMap<MemberId, MemberDues> = self
            .dues
            .list_for_cycle(cycle_id)
            .await?
            .into_iter()
            .map(|d| (d.member_id, d))
            .collect();

        Ok(members
            .into_iter()
            .map(|m| {
                let dues = stored
                    .remove(&m.id)
                    .unwrap_or_else(|| MemberDues::unpaid(m.id, cycle_id.clone()));
                (m.id, dues)
            })
            .collect())
    }

    /// Members whose dues for `cycle_id` are unsettled past the grace deadline.
    pub async fn list_overdue(
        &self,
        cycle_id: &CycleId,
        now: Timestamp,
    ) -> Result<Vec<MemberDues>, ClubError> {
        let cycle = self.cycles.get_by_id(cycle_id).await?;
        Ok(self
            .list_member_dues_for_cycle(cycle_id)
            .await?
            .into_values()
            .filter(|d| d.is_overdue(&cycle, now))
            .collect())
    }

    /// Payments for a member, newest first.
    pub async fn list_payments_for_member(
        &self,
        member_id: &MemberId,
    ) -> Result<Vec<Payment>, ClubError> {
        Ok(self.payments.list_for_member(member_id).await?)
    }

    /// Promotes a `PendingPayment` member whose active-cycle dues are settled.
    ///
    /// Returns the promoted member, or `None` if nothing changed.
    pub async fn promote_if_settled(&self, member_id: &MemberId) -> Result<Option<Member>, ClubError> {
        let member = self.members.get_by_id(member_id).await?;
        if member.status != MemberStatus::PendingPayment {
            return Ok(None);
        }
        let Some(cycle) = self.cycles.get_active_cycle().await? else {
            return Ok(None);
        };
        let dues = self.get_member_dues(member_id, &cycle.id).await?;
        self.promote(&member, &dues).await
    }

    /// Reactivates an `Inactive` member.
    ///
    /// The member returns to `Active` if the active cycle's dues are settled,
    /// otherwise to `PendingPayment`.
    pub async fn reactivate_member(
        &self,
        member_id: &MemberId,
        admin: AdminId,
    ) -> Result<Member, ClubError> {
        let member = self.members.get_by_id(member_id).await?;
        if member.status != MemberStatus::Inactive {
            return Err(ClubError::illegal_transition(member.status, MemberStatus::Active));
        }

        let settled = match self.cycles.get_active_cycle().await? {
            Some(cycle) => self.active_dues_settled(member_id, &cycle).await?,
            None => false,
        };
        let target = if settled {
            MemberStatus::Active
        } else {
            MemberStatus::PendingPayment
        };

        let member = self.members.update_status(member_id, target).await?;
        tracing::info!(member_id = %member_id, admin = %admin, status = %target, "Member reactivated");
        Ok(member)
    }

    /// Admin status change that keeps reactivation on the dues policy.
    ///
    /// Moving an `Inactive` member back to `Active` or `PendingPayment` goes
    /// through [`Self::reactivate_member`]; every other move is a plain
    /// transition.
    pub async fn set_member_status(
        &self,
        member_id: &MemberId,
        target: MemberStatus,
        admin: AdminId,
    ) -> Result<Member, ClubError> {
        let member = self.members.get_by_id(member_id).await?;
        let reactivating = member.status == MemberStatus::Inactive
            && matches!(target, MemberStatus::Active | MemberStatus::PendingPayment);
        if reactivating {
            return self.reactivate_member(member_id, admin).await;
        }

        let member = self.members.update_status(member_id, target).await?;
        tracing::info!(member_id = %member_id, admin = %admin, status = %member.status, "Status set by admin");
        Ok(member)
    }

    async fn active_dues_settled(&self, member_id: &MemberId, cycle: &Cycle) -> Result<bool, ClubError> {
        Ok(self.get_member_dues(member_id, &cycle.id).await?.is_settled())
    }

    /// Writes the dues record for a paid payment and promotes the member.
    /// Every step is skipped if already done.
    ///
    /// A record that is already settled, by this payment or by an admin, is
    /// left as it is.
    async fn apply_settlement(&self, payment: &Payment) -> Result<(), ClubError> {
        let Some(cycle_id) = &payment.cycle_id else {
            return Ok(());
        };
        let mut dues = self.get_member_dues(&payment.member_id, cycle_id).await?;
        if dues.is_settled() {
            if !dues.is_paid_by(&payment.id) {
                tracing::info!(
                    payment_id = %payment.id,
                    dues_status = %dues.status,
                    "Dues already settled, keeping existing record"
                );
            }
        } else {
            let paid_at = payment.paid_at.unwrap_or(payment.updated_at);
            dues.mark_paid(payment.id, paid_at, Timestamp::now());
            self.dues.upsert(&dues).await?;
        }
        let member = self.members.get_by_id(&payment.member_id).await?;
        self.after_dues_write(&member, &dues, payment.amount.clone()).await
    }

    async fn after_dues_write(
        &self,
        member: &Member,
        dues: &MemberDues,
        amount: Money,
    ) -> Result<(), ClubError> {
        let summary = DuesSummary {
            cycle_id: dues.cycle_id.clone(),
            amount,
            paid: dues.is_settled(),
            paid_at: dues.paid_at.or(dues.paid_offline_at),
            payment_ref: dues.payment_ref,
        };
        if member.dues_summary.as_ref() != Some(&summary) {
            if let Err(err) = self.members.refresh_dues_summary(&member.id, summary).await {
                tracing::warn!(member_id = %member.id, error = %err, "Dues summary not refreshed");
            }
        }
        self.promote(member, dues).await?;
        Ok(())
    }

    async fn promote(&self, member: &Member, dues: &MemberDues) -> Result<Option<Member>, ClubError> {
        if !dues.is_settled() || member.status != MemberStatus::PendingPayment {
            return Ok(None);
        }
        let promoted = self.members.update_status(&member.id, MemberStatus::Active).await?;
        tracing::info!(member_id = %member.id, cycle_id = %dues.cycle_id, "Member promoted to active");
        Ok(Some(promoted))
    }

    fn existing_for(existing: Payment, member_id: &MemberId) -> Result<Payment, ClubError> {
        if &existing.member_id == member_id {
            Ok(existing)
        } else {
            Err(ClubError::conflict("payment", existing.gateway_session_id))
        }
    }
}
