//! Member domain - the club-membership record and its status machine.

mod aggregate;
mod profile;
mod status;

pub use aggregate::{DuesSummary, Member, MemberProfile};
pub use profile::{advance_on_profile_complete, ProfileUpdate};
pub use status::MemberStatus;
