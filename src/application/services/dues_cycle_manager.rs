//! DuesCycleManager - billing-period definitions and the single active cycle.

use std::sync::Arc;

use crate::domain::dues::{Cycle, FiscalCalendar};
use crate::domain::foundation::{AdminId, Currency, CycleId, Money, Timestamp};
use crate::domain::ClubError;
use crate::ports::CycleRepository;

/// Command to create a billing cycle.
#[derive(Debug, Clone)]
pub struct CreateCycleCommand {
    pub ending_year: i32,
    pub amount_cents: i64,
    /// Defaults to the configured currency.
    pub currency: Option<String>,
    /// Defaults to the configured grace period.
    pub grace_days: Option<u32>,
    pub created_by: AdminId,
}

/// Defaults applied to new cycles.
#[derive(Debug, Clone)]
pub struct CycleDefaults {
    pub calendar: FiscalCalendar,
    pub currency: Currency,
    pub grace_days: u32,
}

impl Default for CycleDefaults {
    fn default() -> Self {
        Self {
            calendar: FiscalCalendar::default(),
            currency: Currency::usd(),
            grace_days: 30,
        }
    }
}

/// Service owning billing cycles.
///
/// Guarantees at most one active cycle by letting the store switch cycles
/// on and off under its own lock.
pub struct DuesCycleManager {
    cycles: Arc<dyn CycleRepository>,
    defaults: CycleDefaults,
}

impl DuesCycleManager {
    pub fn new(cycles: Arc<dyn CycleRepository>, defaults: CycleDefaults) -> Self {
        Self { cycles, defaults }
    }

    /// Creates an inactive cycle. The same ending year twice is a conflict.
    pub async fn create_cycle(&self, cmd: CreateCycleCommand) -> Result<Cycle, ClubError> {
        let currency = match cmd.currency {
            Some(code) => Currency::parse(code)?,
            None => self.defaults.currency.clone(),
        };
        let amount = Money::new(cmd.amount_cents, currency)?;
        let cycle = Cycle::new(
            cmd.ending_year,
            amount,
            cmd.grace_days.unwrap_or(self.defaults.grace_days),
            cmd.created_by,
            &self.defaults.calendar,
            Timestamp::now(),
        )?;

        self.cycles.insert(&cycle).await?;

        tracing::info!(
            cycle_id = %cycle.id,
            amount = %cycle.amount,
            created_by = %cycle.created_by,
            "Cycle created"
        );
        Ok(cycle)
    }

    /// Makes `cycle_id` the only active cycle.
    ///
    /// The store switches every other cycle off in the same unit of work.
    pub async fn activate_cycle(&self, cycle_id: &CycleId) -> Result<Cycle, ClubError> {
        let activated = self.cycles.activate(cycle_id, Timestamp::now()).await?;
        tracing::info!(cycle_id = %cycle_id, "Cycle activated");
        Ok(activated)
    }

    /// Leaves no cycle active if `cycle_id` was the active one.
    pub async fn deactivate_cycle(&self, cycle_id: &CycleId) -> Result<Cycle, ClubError> {
        let cycle = self.cycles.deactivate(cycle_id, Timestamp::now()).await?;
        tracing::info!(cycle_id = %cycle_id, "Cycle deactivated");
        Ok(cycle)
    }

    /// The active cycle, or `None` if no cycle is active.
    pub async fn get_active_cycle(&self) -> Result<Option<Cycle>, ClubError> {
        Ok(self.cycles.find_active().await?)
    }

    pub async fn get_by_id(&self, cycle_id: &CycleId) -> Result<Cycle, ClubError> {
        self.cycles
            .find_by_id(cycle_id)
            .await?
            .ok_or_else(|| ClubError::not_found("cycle", cycle_id))
    }

    /// All cycles, newest start date first.
    pub async fn list_all(&self) -> Result<Vec<Cycle>, ClubError> {
        Ok(self.cycles.list_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use tokio::sync::Barrier;

    /// Holds `activate` for one cycle until the test releases it.
    struct HeldActivation {
        inner: Arc<InMemoryStore>,
        held: CycleId,
        reached: Barrier,
        release: Barrier,
    }

    #[async_trait]
    impl CycleRepository for HeldActivation {
        async fn insert(&self, cycle: &Cycle) -> Result<(), DomainError> {
            self.inner.insert(cycle).await
        }

        async fn find_by_id(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError> {
            self.inner.find_by_id(id).await
        }

        async fn find_active(&self) -> Result<Option<Cycle>, DomainError> {
            self.inner.find_active().await
        }

        async fn list_all(&self) -> Result<Vec<Cycle>, DomainError> {
            self.inner.list_all().await
        }

        async fn activate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError> {
            if target == &self.held {
                self.reached.wait().await;
                self.release.wait().await;
            }
            self.inner.activate(target, now).await
        }

        async fn deactivate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError> {
            self.inner.deactivate(target, now).await
        }
    }

    fn manager() -> (DuesCycleManager, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (DuesCycleManager::new(store.clone(), CycleDefaults::default()), store)
    }

    fn create(year: i32) -> CreateCycleCommand {
        CreateCycleCommand {
            ending_year: year,
            amount_cents: 8500,
            currency: None,
            grace_days: None,
            created_by: AdminId::new("admin_1").unwrap(),
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_is_inactive() {
        let (manager, _) = manager();

        let cycle = manager.create_cycle(create(2026)).await.unwrap();

        assert_eq!(cycle.id.as_str(), "fy2026");
        assert_eq!(cycle.amount.currency.as_str(), "USD");
        assert_eq!(cycle.grace_days, 30);
        assert!(!cycle.is_active);
        assert!(manager.get_active_cycle().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_year_twice_is_conflict() {
        let (manager, _) = manager();
        manager.create_cycle(create(2026)).await.unwrap();

        let err = manager.create_cycle(create(2026)).await.unwrap_err();

        assert!(matches!(err, ClubError::Conflict { entity: "cycle", .. }));
        assert_eq!(manager.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn negative_amount_is_rejected() {
        let (manager, _) = manager();
        let mut cmd = create(2026);
        cmd.amount_cents = -1;

        assert!(matches!(
            manager.create_cycle(cmd).await,
            Err(ClubError::ValidationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn activation_switches_the_active_cycle() {
        let (manager, store) = manager();
        manager.create_cycle(create(2025)).await.unwrap();
        manager.create_cycle(create(2026)).await.unwrap();

        manager.activate_cycle(&CycleId::for_ending_year(2025)).await.unwrap();
        manager.activate_cycle(&CycleId::for_ending_year(2026)).await.unwrap();

        let active = manager.get_active_cycle().await.unwrap().unwrap();
        assert_eq!(active.id.as_str(), "fy2026");
        assert_eq!(store.active_cycle_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn activation_overlapping_a_newer_one_leaves_one_active() {
        let store = Arc::new(InMemoryStore::new());
        let held = Arc::new(HeldActivation {
            inner: store.clone(),
            held: CycleId::for_ending_year(2025),
            reached: Barrier::new(2),
            release: Barrier::new(2),
        });
        let manager = Arc::new(DuesCycleManager::new(held.clone(), CycleDefaults::default()));
        manager.create_cycle(create(2025)).await.unwrap();

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.activate_cycle(&CycleId::for_ending_year(2025)).await })
        };
        held.reached.wait().await;

        manager.create_cycle(create(2026)).await.unwrap();
        manager.activate_cycle(&CycleId::for_ending_year(2026)).await.unwrap();
        held.release.wait().await;
        pending.await.unwrap().unwrap();

        let active: Vec<String> = manager
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.is_active)
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(active, vec!["fy2025"]);
        assert_eq!(store.active_cycle_count().await, 1);
    }

    #[tokio::test]
    async fn activating_unknown_cycle_is_not_found() {
        let (manager, _) = manager();
        let err = manager
            .activate_cycle(&CycleId::for_ending_year(2030))
            .await
            .unwrap_err();
        assert!(matches!(err, ClubError::NotFound { entity: "cycle", .. }));
    }

    #[tokio::test]
    async fn failed_activation_leaves_previous_state() {
        let (manager, store) = manager();
        manager.create_cycle(create(2025)).await.unwrap();
        manager.create_cycle(create(2026)).await.unwrap();
        manager.activate_cycle(&CycleId::for_ending_year(2025)).await.unwrap();

        store.set_unavailable(true);
        assert!(manager.activate_cycle(&CycleId::for_ending_year(2026)).await.is_err());
        store.set_unavailable(false);

        let active = manager.get_active_cycle().await.unwrap().unwrap();
        assert_eq!(active.id.as_str(), "fy2025");
    }

    #[tokio::test]
    async fn deactivate_leaves_no_active_cycle() {
        let (manager, _) = manager();
        manager.create_cycle(create(2026)).await.unwrap();
        let id = CycleId::for_ending_year(2026);
        manager.activate_cycle(&id).await.unwrap();

        let cycle = manager.deactivate_cycle(&id).await.unwrap();

        assert!(!cycle.is_active);
        assert!(manager.get_active_cycle().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let (manager, _) = manager();
        manager.create_cycle(create(2024)).await.unwrap();
        manager.create_cycle(create(2026)).await.unwrap();

        let all = manager.list_all().await.unwrap();
        assert_eq!(all[0].id.as_str(), "fy2026");
    }
}
