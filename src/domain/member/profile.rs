//! Profile updates and the profile-complete transition.

use serde::{Deserialize, Serialize};

use super::{Member, MemberStatus};

/// Fields a member (or admin) may change on the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
}

impl ProfileUpdate {
    /// Returns true if a non-blank name or bio is present.
    pub fn supplies_name_or_bio(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.full_name) || present(&self.bio)
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.bio.is_none()
            && self.photo_url.is_none()
            && self.role.is_none()
            && self.company.is_none()
    }
}

/// Status a member advances to when `update` completes their profile.
///
/// Only a `PendingProfile` member supplying a name or bio advances, and
/// always to `PendingPayment`.
pub fn advance_on_profile_complete(member: &Member, update: &ProfileUpdate) -> Option<MemberStatus> {
    if member.status == MemberStatus::PendingProfile && update.supplies_name_or_bio() {
        Some(MemberStatus::PendingPayment)
    } else {
        None
    }
}
