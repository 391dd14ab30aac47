//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `InvitationRepository` - Invitations, looked up by token hash
//! - `MemberRepository` - Members, unique by email
//! - `CycleRepository` - Billing cycles, with atomic batch writes
//! - `MemberDuesRepository` - Per-member-per-cycle dues records
//! - `PaymentRepository` - Payments, unique by gateway session
//!
//! ## Gateway Ports
//!
//! - `PaymentGateway` - Verified inbound webhook events

mod cycle_repository;
mod invitation_repository;
mod member_dues_repository;
mod member_repository;
mod payment_gateway;
mod payment_repository;

pub use cycle_repository::CycleRepository;
pub use invitation_repository::InvitationRepository;
pub use member_dues_repository::MemberDuesRepository;
pub use member_repository::MemberRepository;
pub use payment_gateway::{GatewayEvent, GatewayEventKind, PaymentGateway};
pub use payment_repository::PaymentRepository;
