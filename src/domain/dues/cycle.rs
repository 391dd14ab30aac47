//! Billing cycles and the fiscal calendar they are derived from.
//!
//! # Design Decisions
//!
//! - **Deterministic id**: `fy<ending_year>`, so creating a year twice is a
//!   key conflict rather than a second cycle
//! - **Created inactive**: activation is always a separate step
//! - **Batch activation**: [`activation_batch`] computes the new state of
//!   every stored cycle; the store applies it under the same lock it read with

use crate::domain::foundation::{AdminId, CycleId, Money, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

const MIN_ENDING_YEAR: i32 = 1900;
const MAX_ENDING_YEAR: i32 = 9999;
const MAX_GRACE_DAYS: u32 = 365;

/// Fiscal-year convention used to derive cycle boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    start_month: u32,
}

impl FiscalCalendar {
    /// Fiscal years starting on the first of `start_month` (1-12).
    pub fn starting_in(start_month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&start_month) {
            return Err(ValidationError::out_of_range(
                "fiscal_year_start_month",
                1,
                12,
                start_month as i64,
            ));
        }
        Ok(Self { start_month })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// First and last second of the fiscal year ending in `ending_year`.
    pub fn period(&self, ending_year: i32) -> Result<(Timestamp, Timestamp), ValidationError> {
        if !(MIN_ENDING_YEAR..=MAX_ENDING_YEAR).contains(&ending_year) {
            return Err(ValidationError::out_of_range(
                "ending_year",
                MIN_ENDING_YEAR as i64,
                MAX_ENDING_YEAR as i64,
                ending_year as i64,
            ));
        }
        let start_year = self.start_year(ending_year);
        let start = Timestamp::start_of_date(start_year, self.start_month, 1);
        let next = Timestamp::start_of_date(start_year + 1, self.start_month, 1);
        match (start, next) {
            (Some(start), Some(next)) => Ok((start, next.plus_secs(-1))),
            _ => Err(ValidationError::invalid_format("ending_year", "date out of range")),
        }
    }

    /// Human-readable label, e.g. `2025-2026`.
    pub fn label(&self, ending_year: i32) -> String {
        let start_year = self.start_year(ending_year);
        if start_year == ending_year {
            ending_year.to_string()
        } else {
            format!("{}-{}", start_year, ending_year)
        }
    }

    fn start_year(&self, ending_year: i32) -> i32 {
        if self.start_month == 1 {
            ending_year
        } else {
            ending_year - 1
        }
    }
}

impl Default for FiscalCalendar {
    /// July-to-June.
    fn default() -> Self {
        Self { start_month: 7 }
    }
}

/// A billing period with a fixed dues amount.
///
/// # Invariants
///
/// - across all cycles, at most one has `is_active = true`
/// - `start_date < end_date`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub label: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub amount: Money,
    pub is_active: bool,
    pub grace_days: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub created_by: AdminId,
}

impl Cycle {
    /// Creates an inactive cycle for the fiscal year ending in `ending_year`.
    pub fn new(
        ending_year: i32,
        amount: Money,
        grace_days: u32,
        created_by: AdminId,
        calendar: &FiscalCalendar,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if grace_days > MAX_GRACE_DAYS {
            return Err(ValidationError::out_of_range(
                "grace_days",
                0,
                MAX_GRACE_DAYS as i64,
                grace_days as i64,
            ));
        }
        let (start_date, end_date) = calendar.period(ending_year)?;
        Ok(Self {
            id: CycleId::for_ending_year(ending_year),
            label: calendar.label(ending_year),
            start_date,
            end_date,
            amount,
            is_active: false,
            grace_days,
            created_at: now,
            updated_at: now,
            created_by,
        })
    }

    /// Last moment dues may be settled before the member is overdue.
    pub fn grace_deadline(&self) -> Timestamp {
        self.start_date.add_days(self.grace_days as i64)
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        at >= self.start_date && at <= self.end_date
    }

    fn set_active(&mut self, active: bool, now: Timestamp) {
        self.is_active = active;
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Computes the records to write so that `target` is the only active cycle.
///
/// The batch holds the new state of every cycle in `cycles`, deactivations
/// first. `cycles` must be the full stored set, read inside the write's
/// critical section. Returns `None` if `target` is not among `cycles`.
pub fn activation_batch(cycles: Vec<Cycle>, target: &CycleId, now: Timestamp) -> Option<Vec<Cycle>> {
    if !cycles.iter().any(|c| &c.id == target) {
        return None;
    }
    let mut batch: Vec<Cycle> = cycles
        .into_iter()
        .map(|mut c| {
            let on = &c.id == target;
            if c.is_active != on {
                c.set_active(on, now);
            }
            c
        })
        .collect();
    batch.sort_by_key(|c| c.is_active);
    Some(batch)
}

/// Computes the write that leaves no cycle active, if `target` is active.
pub fn deactivation_batch(mut cycle: Cycle, now: Timestamp) -> Vec<Cycle> {
    if !cycle.is_active {
        return Vec::new();
    }
    cycle.set_active(false, now);
    vec![cycle]
}
