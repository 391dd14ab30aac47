//! Cycle repository port.
//!
//! # Design
//!
//! - **Deterministic keys**: inserting an existing cycle id is a conflict
//! - **Store-side activation**: `activate` decides which cycles to switch off
//!   against the stored state, inside one critical section or transaction

use crate::domain::dues::Cycle;
use crate::domain::foundation::{CycleId, DomainError, Timestamp};
use async_trait::async_trait;

#[async_trait]
pub trait CycleRepository: Send + Sync {
    /// Persist a new cycle.
    ///
    /// # Errors
    ///
    /// - `CycleExists` if the id is taken
    async fn insert(&self, cycle: &Cycle) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError>;

    /// The cycle with `is_active = true`, if any.
    async fn find_active(&self) -> Result<Option<Cycle>, DomainError>;

    /// All cycles ordered by start date, newest first.
    async fn list_all(&self) -> Result<Vec<Cycle>, DomainError>;

    /// Makes `target` the only active cycle, atomically.
    ///
    /// Every other stored cycle is switched off in the same unit of work,
    /// including ones created after the caller last read the list.
    ///
    /// # Errors
    ///
    /// - `CycleNotFound` if `target` doesn't exist (nothing is written)
    /// - `DatabaseError` on persistence failure (nothing is written)
    async fn activate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError>;

    /// Clears the active flag on `target`. A no-op if it is already inactive.
    ///
    /// # Errors
    ///
    /// - `CycleNotFound` if `target` doesn't exist
    async fn deactivate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError>;
}
