//! PostgreSQL implementation of MemberDuesRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt, db_error};
use crate::domain::dues::{DuesStatus, MemberDues};
use crate::domain::foundation::{AdminId, CycleId, DomainError, MemberId, PaymentId, Timestamp};
use crate::ports::MemberDuesRepository;

const COLUMNS: &str = r#"
    member_id, cycle_id, status, paid_at, paid_offline_at, waived_at,
    payment_ref, note, updated_by, updated_at
"#;

pub struct PostgresMemberDuesRepository {
    pool: PgPool,
}

impl PostgresMemberDuesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberDuesRow {
    member_id: Uuid,
    cycle_id: String,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    paid_offline_at: Option<DateTime<Utc>>,
    waived_at: Option<DateTime<Utc>>,
    payment_ref: Option<Uuid>,
    note: Option<String>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<MemberDuesRow> for MemberDues {
    type Error = DomainError;

    fn try_from(row: MemberDuesRow) -> Result<Self, Self::Error> {
        Ok(MemberDues {
            member_id: MemberId::from_uuid(row.member_id),
            cycle_id: CycleId::parse(&row.cycle_id).map_err(|e| corrupt("cycle_id", e))?,
            status: DuesStatus::parse(&row.status).map_err(|e| corrupt("status", e))?,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            paid_offline_at: row.paid_offline_at.map(Timestamp::from_datetime),
            waived_at: row.waived_at.map(Timestamp::from_datetime),
            payment_ref: row.payment_ref.map(PaymentId::from_uuid),
            note: row.note,
            updated_by: row
                .updated_by
                .map(AdminId::new)
                .transpose()
                .map_err(|e| corrupt("updated_by", e))?,
            updated_at: row.updated_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl MemberDuesRepository for PostgresMemberDuesRepository {
    async fn find(
        &self,
        member_id: &MemberId,
        cycle_id: &CycleId,
    ) -> Result<Option<MemberDues>, DomainError> {
        let sql = format!(
            "SELECT {} FROM member_dues WHERE member_id = $1 AND cycle_id = $2",
            COLUMNS
        );
        let row = sqlx::query_as::<_, MemberDuesRow>(&sql)
            .bind(member_id.as_uuid())
            .bind(cycle_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch member dues", e))?;
        row.map(MemberDues::try_from).transpose()
    }

    async fn upsert(&self, dues: &MemberDues) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO member_dues (
                member_id, cycle_id, status, paid_at, paid_offline_at, waived_at,
                payment_ref, note, updated_by, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (member_id, cycle_id) DO UPDATE SET
                status = EXCLUDED.status,
                paid_at = EXCLUDED.paid_at,
                paid_offline_at = EXCLUDED.paid_offline_at,
                waived_at = EXCLUDED.waived_at,
                payment_ref = EXCLUDED.payment_ref,
                note = EXCLUDED.note,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(dues.member_id.as_uuid())
        .bind(dues.cycle_id.as_str())
        .bind(dues.status.as_str())
        .bind(dues.paid_at.map(|t| *t.as_datetime()))
        .bind(dues.paid_offline_at.map(|t| *t.as_datetime()))
        .bind(dues.waived_at.map(|t| *t.as_datetime()))
        .bind(dues.payment_ref.map(|p| *p.as_uuid()))
        .bind(&dues.note)
        .bind(dues.updated_by.as_ref().map(|a| a.as_str()))
        .bind(dues.updated_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to upsert member dues", e))?;
        Ok(())
    }

    async fn list_for_cycle(&self, cycle_id: &CycleId) -> Result<Vec<MemberDues>, DomainError> {
        let sql = format!("SELECT {} FROM member_dues WHERE cycle_id = $1", COLUMNS);
        let rows = sqlx::query_as::<_, MemberDuesRow>(&sql)
            .bind(cycle_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list member dues", e))?;
        rows.into_iter().map(MemberDues::try_from).collect()
    }
}
