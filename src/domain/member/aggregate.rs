//! Member aggregate entity.
//!
//! A Member is a person's club-membership record. Members are never
//! hard-deleted; deactivation is a status value.
//!
//! # Design Decisions
//!
//! - **Unique email**: emails are lower-cased on construction and enforced
//!   unique by the store
//! - **Status via state machine**: every status change goes through
//!   `MemberStatus::can_transition_to`
//! - **Cached dues**: `dues_summary` mirrors the latest ledger fact for
//!   convenience reads and is never consulted for access decisions

use crate::domain::foundation::{
    CycleId, DomainError, Email, ErrorCode, MemberId, Money, PaymentId, StateMachine, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::{MemberStatus, ProfileUpdate};

/// Free-form profile fields filled in during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
}

/// Denormalized copy of the member's dues state for the most recently
/// written cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesSummary {
    pub cycle_id: CycleId,
    pub amount: Money,
    pub paid: bool,
    pub paid_at: Option<Timestamp>,
    pub payment_ref: Option<PaymentId>,
}

/// Member aggregate.
///
/// # Invariants
///
/// - `email` is lower-cased and unique across members
/// - `full_name` is derived from `first_name` and `last_name`
/// - `status` only changes along `MemberStatus` transitions
/// - timestamps never move backwards once set
/// - `version` grows by one with every stored update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub status: MemberStatus,
    pub is_admin: bool,
    pub profile: MemberProfile,
    pub dues_summary: Option<DuesSummary>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub invited_at: Option<Timestamp>,
    pub profile_completed_at: Option<Timestamp>,
    /// Write counter checked by compare-and-set updates.
    #[serde(default)]
    pub version: i64,
}

impl Member {
    /// Creates a member in the given initial status.
    pub fn new(
        email: Email,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        status: MemberStatus,
        is_admin: bool,
        now: Timestamp,
    ) -> Self {
        let first_name = first_name.into().trim().to_string();
        let last_name = last_name.into().trim().to_string();
        let full_name = derive_full_name(&first_name, &last_name);
        Self {
            id: MemberId::new(),
            email,
            first_name,
            last_name,
            full_name,
            status,
            is_admin,
            profile: MemberProfile::default(),
            dues_summary: None,
            created_at: now,
            updated_at: now,
            invited_at: (status == MemberStatus::Invited).then_some(now),
            profile_completed_at: None,
            version: 0,
        }
    }

    /// Creates a member originating from an invitation.
    pub fn invited(
        email: Email,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self::new(email, first_name, last_name, MemberStatus::Invited, false, now)
    }

    /// Returns true if this member passes the access gate.
    pub fn has_access(&self) -> bool {
        self.status.has_access()
    }

    /// Returns true once the profile is complete enough to request payment.
    ///
    /// Members created directly into a later stage count as complete.
    pub fn is_profile_complete(&self) -> bool {
        self.profile_completed_at.is_some()
            || !matches!(
                self.status,
                MemberStatus::Invited | MemberStatus::PendingProfile
            )
    }

    /// Moves the member to `target`.
    ///
    /// Returns `Ok(false)` when the member is already in `target`.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` if the transition table forbids the move.
    pub fn transition_to(&mut self, target: MemberStatus, now: Timestamp) -> Result<bool, DomainError> {
        if self.status == target {
            return Ok(false);
        }
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition member from {} to {}", self.status, target),
            )
            .with_detail("from", self.status.as_str())
            .with_detail("to", target.as_str())
        })?;
        self.touch(now);
        Ok(true)
    }

    /// Writes the supplied profile fields. Never changes status.
    pub fn apply_profile_update(&mut self, update: &ProfileUpdate, now: Timestamp) {
        if let Some(name) = update.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let (first, last) = split_full_name(name);
            self.first_name = first;
            self.last_name = last;
            self.full_name = derive_full_name(&self.first_name, &self.last_name);
        }
        if let Some(bio) = &update.bio {
            self.profile.bio = Some(bio.clone());
        }
        if let Some(photo_url) = &update.photo_url {
            self.profile.photo_url = Some(photo_url.clone());
        }
        if let Some(role) = &update.role {
            self.profile.role = Some(role.clone());
        }
        if let Some(company) = &update.company {
            self.profile.company = Some(company.clone());
        }
        self.touch(now);
    }

    /// Applies the profile-complete transition and stamps `profile_completed_at`.
    pub fn complete_profile(&mut self, target: MemberStatus, now: Timestamp) -> Result<bool, DomainError> {
        let changed = self.transition_to(target, now)?;
        if changed && self.profile_completed_at.is_none() {
            self.profile_completed_at = Some(now);
        }
        Ok(changed)
    }

    /// Replaces the cached dues summary.
    pub fn refresh_dues_summary(&mut self, summary: DuesSummary, now: Timestamp) {
        self.dues_summary = Some(summary);
        self.touch(now);
    }

    fn touch(&mut self, now: Timestamp) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

fn derive_full_name(first: &str, last: &str) -> String {
    [first, last]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_full_name(name: &str) -> (String, String) {
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}
