//! Application layer - services and command handlers.
//!
//! Services own the membership lifecycle operations; handlers adapt
//! inbound gateway traffic onto them. Both depend only on ports.

mod club;
pub mod handlers;
pub mod services;

pub use club::{ClubServices, Repositories};
pub use handlers::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use services::{
    AccessGate, CreateCycleCommand, CreateInvitationCommand, CreateMemberCommand,
    CreatePaymentCommand, CycleDefaults, DuesCycleManager, DuesLedger, InvitationService,
    IssuedInvitation, MemberRegistry, Reconciliation, RedeemCommand, Redemption,
    DEFAULT_VALIDITY_DAYS,
};
