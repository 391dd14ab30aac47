//! Shared state and failure injection for the in-memory store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::dues::{Cycle, MemberDues, Payment};
use crate::domain::foundation::{CycleId, DomainError, InvitationId, MemberId, PaymentId};
use crate::domain::invitation::Invitation;
use crate::domain::member::Member;

#[derive(Default)]
pub(super) struct State {
    pub invitations: HashMap<InvitationId, Invitation>,
    pub members: HashMap<MemberId, Member>,
    pub cycles: HashMap<CycleId, Cycle>,
    pub dues: HashMap<(MemberId, CycleId), MemberDues>,
    pub payments: HashMap<PaymentId, Payment>,
}

/// Process-local store with document-store semantics.
///
/// Every single-record operation runs under the write lock, so reads and
/// compare-and-set updates are atomic per record. Cycle activation holds the
/// same lock across all cycles.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// let registry = MemberRegistry::new(store.clone());
///
/// // Simulate an outage in tests
/// store.set_unavailable(true);
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    pub(super) state: RwLock<State>,
    unavailable: AtomicBool,
    fail_dues_writes: AtomicBool,
    fail_member_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes every operation fail with `DatabaseError`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes member-dues writes fail while reads keep working.
    pub fn fail_dues_writes(&self, fail: bool) {
        self.fail_dues_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes member writes fail while reads keep working.
    pub fn fail_member_writes(&self, fail: bool) {
        self.fail_member_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Number of cycles currently flagged active.
    pub async fn active_cycle_count(&self) -> usize {
        self.state.read().await.cycles.values().filter(|c| c.is_active).count()
    }

    // === Internal ===

    pub(super) fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("in-memory store unavailable"));
        }
        Ok(())
    }

    pub(super) fn check_dues_writable(&self) -> Result<(), DomainError> {
        self.check_available()?;
        if self.fail_dues_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("member dues write failed"));
        }
        Ok(())
    }

    pub(super) fn check_members_writable(&self) -> Result<(), DomainError> {
        self.check_available()?;
        if self.fail_member_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("member write failed"));
        }
        Ok(())
    }
}
