//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process store implementing every repository port
//! - `postgres` - PostgreSQL repositories (sqlx)
//! - `stripe` - Stripe webhook verification behind `PaymentGateway`
//! - `http` - axum routes for the member, admin and webhook surfaces

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
