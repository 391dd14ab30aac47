//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe Checkout webhooks:
//! - Signature verification (HMAC-SHA256, constant-time comparison)
//! - Replay window on the signed timestamp
//! - Translation of checkout session events into gateway events
//!
//! # Configuration
//!
//! The webhook signing secret (`whsec_...`) comes from the `payment` config
//! section.

mod stripe_adapter;
mod webhook_types;

pub use stripe_adapter::{sign_payload, StripeConfig, StripeWebhookGateway, DEFAULT_TOLERANCE_SECS};
pub use webhook_types::{SignatureHeader, SignatureParseError, StripeCheckoutSession, StripeWebhookEvent};
