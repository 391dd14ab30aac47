//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `invitation` - Single-use onboarding credentials
//! - `member` - Member record and its status machine
//! - `dues` - Billing cycles, per-member dues, payments
//! - `access` - Access decisions derived from member status
//! - `errors` - Service-level error taxonomy

pub mod access;
pub mod dues;
pub mod errors;
pub mod foundation;
pub mod invitation;
pub mod member;

pub use errors::ClubError;
