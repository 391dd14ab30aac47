//! Access decisions.
//!
//! Access is a pure function of the member's stored status. Dues are never
//! consulted here; the ledger expresses settlement by promoting the member.
//! Callers must treat any error while deciding as a denial.

use serde::{Deserialize, Serialize};

use super::member::{Member, MemberStatus};

/// Reason access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No member record for this identity.
    NotAMember,
    /// Invitation accepted but onboarding not started.
    InvitationPending,
    ProfileIncomplete,
    PaymentPending,
    Deactivated,
}

impl DenialReason {
    /// Reason for a member in `status`, or `None` if the status grants access.
    pub fn for_status(status: MemberStatus) -> Option<Self> {
        match status {
            MemberStatus::Active => None,
            MemberStatus::Invited => Some(DenialReason::InvitationPending),
            MemberStatus::PendingProfile => Some(DenialReason::ProfileIncomplete),
            MemberStatus::PendingPayment => Some(DenialReason::PaymentPending),
            MemberStatus::Inactive => Some(DenialReason::Deactivated),
        }
    }

    /// User-facing message for the denial.
    pub fn user_message(&self) -> &'static str {
        match self {
            DenialReason::NotAMember => "No membership found for this account.",
            DenialReason::InvitationPending => {
                "Your invitation has been accepted. Please finish onboarding."
            }
            DenialReason::ProfileIncomplete => "Please complete your profile to continue.",
            DenialReason::PaymentPending => "Your dues payment is pending.",
            DenialReason::Deactivated => {
                "Your membership is deactivated. Please contact an administrator."
            }
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub has_access: bool,
    pub member: Option<Member>,
    pub reason: Option<DenialReason>,
}

impl AccessDecision {
    /// Decides access for an optional member record.
    pub fn for_member(member: Option<Member>) -> Self {
        match member {
            None => Self {
                has_access: false,
                member: None,
                reason: Some(DenialReason::NotAMember),
            },
            Some(member) => {
                let reason = DenialReason::for_status(member.status);
                Self {
                    has_access: reason.is_none(),
                    member: Some(member),
                    reason,
                }
            }
        }
    }

    /// Denied, with no member attached.
    pub fn denied(reason: DenialReason) -> Self {
        Self {
            has_access: false,
            member: None,
            reason: Some(reason),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_access && self.member.as_ref().is_some_and(|m| m.is_admin)
    }
}
