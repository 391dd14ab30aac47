//! PostgreSQL implementation of CycleRepository.
//!
//! `activate` runs in one transaction after locking every cycle row, and
//! the partial unique index `cycles_single_active_idx` rejects any commit
//! that would leave two cycles active.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{corrupt, db_error, violates};
use crate::domain::dues::Cycle;
use crate::domain::foundation::{AdminId, Currency, CycleId, DomainError, ErrorCode, Money, Timestamp};
use crate::ports::CycleRepository;

const COLUMNS: &str = r#"
    id, label, start_date, end_date, amount_cents, currency, is_active,
    grace_days, created_at, updated_at, created_by
"#;

pub struct PostgresCycleRepository {
    pool: PgPool,
}

impl PostgresCycleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CycleRow {
    id: String,
    label: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    amount_cents: i64,
    currency: String,
    is_active: bool,
    grace_days: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: String,
}

impl TryFrom<CycleRow> for Cycle {
    type Error = DomainError;

    fn try_from(row: CycleRow) -> Result<Self, Self::Error> {
        let currency = Currency::parse(row.currency.trim()).map_err(|e| corrupt("currency", e))?;
        Ok(Cycle {
            id: CycleId::parse(&row.id).map_err(|e| corrupt("id", e))?,
            label: row.label,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            amount: Money::new(row.amount_cents, currency).map_err(|e| corrupt("amount_cents", e))?,
            is_active: row.is_active,
            grace_days: u32::try_from(row.grace_days).map_err(|e| corrupt("grace_days", e))?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            created_by: AdminId::new(row.created_by).map_err(|e| corrupt("created_by", e))?,
        })
    }
}

#[async_trait]
impl CycleRepository for PostgresCycleRepository {
    async fn insert(&self, cycle: &Cycle) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO cycles (
                id, label, start_date, end_date, amount_cents, currency, is_active,
                grace_days, created_at, updated_at, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(cycle.id.as_str())
        .bind(&cycle.label)
        .bind(cycle.start_date.as_datetime())
        .bind(cycle.end_date.as_datetime())
        .bind(cycle.amount.amount_cents)
        .bind(cycle.amount.currency.as_str())
        .bind(cycle.is_active)
        .bind(cycle.grace_days as i32)
        .bind(cycle.created_at.as_datetime())
        .bind(cycle.updated_at.as_datetime())
        .bind(cycle.created_by.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "cycles_pkey") {
                return DomainError::new(ErrorCode::CycleExists, "Cycle already exists")
                    .with_detail("key", cycle.id.as_str());
            }
            db_error("Failed to insert cycle", e)
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError> {
        let sql = format!("SELECT {} FROM cycles WHERE id = $1", COLUMNS);
        let row = sqlx::query_as::<_, CycleRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch cycle", e))?;
        row.map(Cycle::try_from).transpose()
    }

    async fn find_active(&self) -> Result<Option<Cycle>, DomainError> {
        let sql = format!("SELECT {} FROM cycles WHERE is_active", COLUMNS);
        let row = sqlx::query_as::<_, CycleRow>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch active cycle", e))?;
        row.map(Cycle::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Cycle>, DomainError> {
        let sql = format!("SELECT {} FROM cycles ORDER BY start_date DESC", COLUMNS);
        let rows = sqlx::query_as::<_, CycleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list cycles", e))?;
        rows.into_iter().map(Cycle::try_from).collect()
    }

    async fn activate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // Serializes concurrent activations.
        let locked: Vec<String> = sqlx::query_scalar("SELECT id FROM cycles ORDER BY id FOR UPDATE")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock cycles", e))?;
        if !locked.iter().any(|id| id == target.as_str()) {
            return Err(not_found(target));
        }

        sqlx::query("UPDATE cycles SET is_active = FALSE, updated_at = $2 WHERE is_active AND id <> $1")
            .bind(target.as_str())
            .bind(now.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to deactivate cycles", e))?;

        let sql = format!(
            r#"
            UPDATE cycles SET
                is_active = TRUE,
                updated_at = CASE WHEN is_active THEN updated_at ELSE $2 END
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        );
        let row = sqlx::query_as::<_, CycleRow>(&sql)
            .bind(target.as_str())
            .bind(now.as_datetime())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to activate cycle", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Cycle::try_from(row)
    }

    async fn deactivate(&self, target: &CycleId, now: Timestamp) -> Result<Cycle, DomainError> {
        let sql = format!(
            r#"
            UPDATE cycles SET
                is_active = FALSE,
                updated_at = CASE WHEN is_active THEN $2 ELSE updated_at END
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        );
        let row = sqlx::query_as::<_, CycleRow>(&sql)
            .bind(target.as_str())
            .bind(now.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to deactivate cycle", e))?;
        row.map(Cycle::try_from).transpose()?.ok_or_else(|| not_found(target))
    }
}

fn not_found(id: &CycleId) -> DomainError {
    DomainError::new(ErrorCode::CycleNotFound, "Cycle not found").with_detail("key", id.as_str())
}
