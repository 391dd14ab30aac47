//! Member dues repository port.
//!
//! Records are keyed by `(member_id, cycle_id)`. A missing record means
//! unpaid; implementations return `None`, never an error.

use crate::domain::dues::MemberDues;
use crate::domain::foundation::{CycleId, DomainError, MemberId};
use async_trait::async_trait;

#[async_trait]
pub trait MemberDuesRepository: Send + Sync {
    async fn find(
        &self,
        member_id: &MemberId,
        cycle_id: &CycleId,
    ) -> Result<Option<MemberDues>, DomainError>;

    /// Insert or overwrite the record for its `(member_id, cycle_id)`.
    async fn upsert(&self, dues: &MemberDues) -> Result<(), DomainError>;

    /// Every stored record for `cycle_id`.
    async fn list_for_cycle(&self, cycle_id: &CycleId) -> Result<Vec<MemberDues>, DomainError>;
}
