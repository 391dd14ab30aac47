//! club-dues - Membership and dues management for a private club.
//!
//! Members join through single-use invitations, move through an onboarding
//! status machine, and keep access by settling dues for the active billing
//! cycle. Settlement arrives from the payment gateway's signed webhooks or
//! from an administrator.
//!
//! The crate is laid out hexagonally: `domain` holds the entities and their
//! rules, `ports` the store and gateway traits, `application` the services,
//! and `adapters` the in-memory, PostgreSQL, Stripe and HTTP implementations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
