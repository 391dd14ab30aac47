//! In-memory document store.
//!
//! Implements every store port over one `tokio::sync::RwLock`. Used when no
//! database is configured, and by the test suites.

mod cycles;
mod dues;
mod invitations;
mod members;
mod payments;
mod store;

pub use store::InMemoryStore;
