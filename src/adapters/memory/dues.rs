use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::dues::MemberDues;
use crate::domain::foundation::{CycleId, DomainError, MemberId};
use crate::ports::MemberDuesRepository;

#[async_trait]
impl MemberDuesRepository for InMemoryStore {
    async fn find(
        &self,
        member_id: &MemberId,
        cycle_id: &CycleId,
    ) -> Result<Option<MemberDues>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.dues.get(&(*member_id, cycle_id.clone())).cloned())
    }

    async fn upsert(&self, dues: &MemberDues) -> Result<(), DomainError> {
        self.check_dues_writable()?;
        let mut state = self.state.write().await;
        state
            .dues
            .insert((dues.member_id, dues.cycle_id.clone()), dues.clone());
        Ok(())
    }

    async fn list_for_cycle(&self, cycle_id: &CycleId) -> Result<Vec<MemberDues>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .dues
            .values()
            .filter(|d| &d.cycle_id == cycle_id)
            .cloned()
            .collect())
    }
}
