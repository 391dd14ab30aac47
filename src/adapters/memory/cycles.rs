use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::dues::{activation_batch, deactivation_batch, Cycle};
use crate::domain::foundation::{CycleId, DomainError, ErrorCode, Timestamp};
use crate::ports::CycleRepository;

#[async_trait]
impl CycleRepository for InMemoryStore {
    async fn insert(&self, cycle: &Cycle) -> Result<(), DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.cycles.contains_key(&cycle.id) {
            return Err(DomainError::new(ErrorCode::CycleExists, "Cycle already exists")
                .with_detail("key", cycle.id.as_str()));
        }
        state.cycles.insert(cycle.id.clone(), cycle.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.cycles.get(id).cloned())
    }

    async fn find_active(&self) -> Result<Option<Cycle>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.cycles.values().find(|c| c.is_active).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Cycle>, DomainError> {
        self.check_available()?;
        let mut cycles: Vec<Cycle> = self.state.read().await.cycles.values().cloned().collect();
        cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(cycles)
    }

    async fn activate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let stored: Vec<Cycle> = state.cycles.values().cloned().collect();
        let batch = activation_batch(stored, target, now).ok_or_else(|| not_found(target))?;

        let mut activated = None;
        for cycle in batch {
            if &cycle.id == target {
                activated = Some(cycle.clone());
            }
            state.cycles.insert(cycle.id.clone(), cycle);
        }
        activated.ok_or_else(|| not_found(target))
    }

    async fn deactivate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let cycle = state.cycles.get(target).cloned().ok_or_else(|| not_found(target))?;
        match deactivation_batch(cycle.clone(), now).pop() {
            Some(updated) => {
                state.cycles.insert(updated.id.clone(), updated.clone());
                Ok(updated)
            }
            None => Ok(cycle),
        }
    }
}

fn not_found(id: &CycleId) -> DomainError {
    DomainError::new(ErrorCode::CycleNotFound, "Cycle not found").with_detail("key", id.as_str())
}
