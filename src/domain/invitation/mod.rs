//! Invitation domain - single-use onboarding credentials.

mod aggregate;
mod status;
mod token;

pub use aggregate::{Invitation, TokenRejection};
pub use status::InvitationStatus;
pub use token::{InvitationToken, TokenHash};
