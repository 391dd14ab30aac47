//! Application services.
//!
//! Each service owns one part of the membership lifecycle and talks to
//! storage only through ports.

mod access_gate;
mod dues_cycle_manager;
mod dues_ledger;
mod invitation_service;
mod member_registry;

pub use access_gate::AccessGate;
pub use dues_cycle_manager::{CreateCycleCommand, CycleDefaults, DuesCycleManager};
pub use dues_ledger::{CreatePaymentCommand, DuesLedger, Reconciliation};
pub use invitation_service::{
    CreateInvitationCommand, InvitationService, IssuedInvitation, RedeemCommand, Redemption,
    DEFAULT_VALIDITY_DAYS,
};
pub use member_registry::{CreateMemberCommand, MemberRegistry};
