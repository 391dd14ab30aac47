//! Dues domain - billing cycles, per-member dues, and payment records.

mod cycle;
mod member_dues;
mod payment;

pub use cycle::{activation_batch, deactivation_batch, Cycle, FiscalCalendar};
pub use member_dues::{DuesStatus, MemberDues};
pub use payment::{Payment, PaymentOutcome, PaymentStatus};
