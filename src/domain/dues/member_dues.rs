//! Per-member billing status within one cycle.

use crate::domain::foundation::{AdminId, CycleId, MemberId, PaymentId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Cycle;

/// Billing status of one member in one cycle.
///
/// `Unpaid` is the default: a missing record means unpaid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuesStatus {
    #[default]
    Unpaid,
    Paid,
    PaidOffline,
    Waived,
}

impl DuesStatus {
    /// Paid online, paid offline, or waived.
    pub fn is_settled(&self) -> bool {
        !matches!(self, DuesStatus::Unpaid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DuesStatus::Unpaid => "unpaid",
            DuesStatus::Paid => "paid",
            DuesStatus::PaidOffline => "paid_offline",
            DuesStatus::Waived => "waived",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(DuesStatus::Unpaid),
            "paid" => Ok(DuesStatus::Paid),
            "paid_offline" => Ok(DuesStatus::PaidOffline),
            "waived" => Ok(DuesStatus::Waived),
            other => Err(ValidationError::invalid_format(
                "dues_status",
                format!("unknown dues status '{}'", other),
            )),
        }
    }
}

impl fmt::Display for DuesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Child record keyed by `(member_id, cycle_id)`.
///
/// Offline and waive actions are idempotent overwrites: re-invoking one
/// re-stamps its timestamp and note. The last write wins on `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDues {
    pub member_id: MemberId,
    pub cycle_id: CycleId,
    pub status: DuesStatus,
    pub paid_at: Option<Timestamp>,
    pub paid_offline_at: Option<Timestamp>,
    pub waived_at: Option<Timestamp>,
    pub payment_ref: Option<PaymentId>,
    pub note: Option<String>,
    pub updated_by: Option<AdminId>,
    pub updated_at: Option<Timestamp>,
}

impl MemberDues {
    /// The record every absent `(member, cycle)` pair reads as.
    pub fn unpaid(member_id: MemberId, cycle_id: CycleId) -> Self {
        Self {
            member_id,
            cycle_id,
            status: DuesStatus::Unpaid,
            paid_at: None,
            paid_offline_at: None,
            waived_at: None,
            payment_ref: None,
            note: None,
            updated_by: None,
            updated_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    /// True if this record already reflects `payment_ref` as paid online.
    pub fn is_paid_by(&self, payment_ref: &PaymentId) -> bool {
        self.status == DuesStatus::Paid && self.payment_ref.as_ref() == Some(payment_ref)
    }

    /// Unsettled past the cycle's grace deadline.
    pub fn is_overdue(&self, cycle: &Cycle, now: Timestamp) -> bool {
        !self.is_settled() && now > cycle.grace_deadline()
    }

    /// Records an online payment.
    pub fn mark_paid(&mut self, payment_ref: PaymentId, paid_at: Timestamp, now: Timestamp) {
        self.status = DuesStatus::Paid;
        self.paid_at = Some(paid_at);
        self.payment_ref = Some(payment_ref);
        self.updated_at = Some(now);
    }

    /// Records a cash/cheque payment taken by an admin.
    pub fn mark_paid_offline(&mut self, admin: AdminId, note: Option<String>, now: Timestamp) {
        self.status = DuesStatus::PaidOffline;
        self.paid_offline_at = Some(now);
        self.note = note.filter(|n| !n.trim().is_empty());
        self.updated_by = Some(admin);
        self.updated_at = Some(now);
    }

    /// Waives the dues. A reason is required.
    pub fn waive(&mut self, admin: AdminId, reason: &str, now: Timestamp) -> Result<(), ValidationError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::empty_field("reason"));
        }
        self.status = DuesStatus::Waived;
        self.waived_at = Some(now);
        self.note = Some(reason.to_string());
        self.updated_by = Some(admin);
        self.updated_at = Some(now);
        Ok(())
    }
}
