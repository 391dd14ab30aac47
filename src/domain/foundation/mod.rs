//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the club dues domain.

mod email;
mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use email::Email;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AdminId, CycleId, GatewaySessionId, InvitationId, MemberId, PaymentId};
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
