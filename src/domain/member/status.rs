//! Member status state machine.
//!
//! Defines the onboarding and membership states and the transitions the
//! registry accepts.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a club member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Created from an invitation that has not finished onboarding.
    Invited,

    /// Onboarded, profile not yet filled in.
    PendingProfile,

    /// Profile complete, dues for the active cycle not settled.
    PendingPayment,

    /// Full member. The only status that passes the access gate.
    Active,

    /// Administratively deactivated. Never a record deletion.
    Inactive,
}

impl MemberStatus {
    pub const ALL: [MemberStatus; 5] = [
        MemberStatus::Invited,
        MemberStatus::PendingProfile,
        MemberStatus::PendingPayment,
        MemberStatus::Active,
        MemberStatus::Inactive,
    ];

    /// Returns true if this status grants access to the protected area.
    pub fn has_access(&self) -> bool {
        matches!(self, MemberStatus::Active)
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Invited => "invited",
            MemberStatus::PendingProfile => "pending_profile",
            MemberStatus::PendingPayment => "pending_payment",
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        MemberStatus::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown member status '{}'", value))
            })
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for MemberStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MemberStatus::*;
        matches!(
            (self, target),
            (Invited, PendingProfile)
                | (PendingProfile, PendingPayment)
                | (PendingPayment, Active)
                // Administrative deactivation
                | (Active, Inactive)
                // Administrative reactivation
                | (Inactive, PendingPayment)
                | (Inactive, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MemberStatus::*;
        match self {
            Invited => vec![PendingProfile],
            PendingProfile => vec![PendingPayment],
            PendingPayment => vec![Active],
            Active => vec![Inactive],
            Inactive => vec![PendingPayment, Active],
        }
    }
}
