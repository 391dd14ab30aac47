//! PostgreSQL implementation of MemberRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt, db_error, violates};
use crate::domain::foundation::{
    Currency, CycleId, DomainError, Email, ErrorCode, MemberId, Money, PaymentId, Timestamp,
};
use crate::domain::member::{DuesSummary, Member, MemberProfile, MemberStatus};
use crate::ports::MemberRepository;

const COLUMNS: &str = r#"
    id, email, first_name, last_name, full_name, status, is_admin,
    bio, photo_url, role, company,
    dues_cycle_id, dues_amount_cents, dues_currency, dues_paid, dues_paid_at, dues_payment_ref,
    created_at, updated_at, invited_at, profile_completed_at, version
"#;

pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a member.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    full_name: String,
    status: String,
    is_admin: bool,
    bio: Option<String>,
    photo_url: Option<String>,
    role: Option<String>,
    company: Option<String>,
    dues_cycle_id: Option<String>,
    dues_amount_cents: Option<i64>,
    dues_currency: Option<String>,
    dues_paid: Option<bool>,
    dues_paid_at: Option<DateTime<Utc>>,
    dues_payment_ref: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    invited_at: Option<DateTime<Utc>>,
    profile_completed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<MemberRow> for Member {
    type Error = DomainError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        let dues_summary = match (row.dues_cycle_id, row.dues_amount_cents, row.dues_currency) {
            (Some(cycle_id), Some(cents), Some(currency)) => Some(DuesSummary {
                cycle_id: CycleId::parse(&cycle_id).map_err(|e| corrupt("dues_cycle_id", e))?,
                amount: Money::new(
                    cents,
                    Currency::parse(&currency).map_err(|e| corrupt("dues_currency", e))?,
                )
                .map_err(|e| corrupt("dues_amount_cents", e))?,
                paid: row.dues_paid.unwrap_or(false),
                paid_at: row.dues_paid_at.map(Timestamp::from_datetime),
                payment_ref: row.dues_payment_ref.map(PaymentId::from_uuid),
            }),
            _ => None,
        };

        Ok(Member {
            id: MemberId::from_uuid(row.id),
            email: Email::parse(&row.email).map_err(|e| corrupt("email", e))?,
            first_name: row.first_name,
            last_name: row.last_name,
            full_name: row.full_name,
            status: MemberStatus::parse(&row.status).map_err(|e| corrupt("status", e))?,
            is_admin: row.is_admin,
            profile: MemberProfile {
                bio: row.bio,
                photo_url: row.photo_url,
                role: row.role,
                company: row.company,
            },
            dues_summary,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            invited_at: row.invited_at.map(Timestamp::from_datetime),
            profile_completed_at: row.profile_completed_at.map(Timestamp::from_datetime),
            version: row.version,
        })
    }
}

fn summary_parts(
    member: &Member,
) -> (
    Option<&str>,
    Option<i64>,
    Option<&str>,
    Option<bool>,
    Option<DateTime<Utc>>,
    Option<Uuid>,
) {
    match &member.dues_summary {
        Some(s) => (
            Some(s.cycle_id.as_str()),
            Some(s.amount.amount_cents),
            Some(s.amount.currency.as_str()),
            Some(s.paid),
            s.paid_at.map(|t| *t.as_datetime()),
            s.payment_ref.map(|p| *p.as_uuid()),
        ),
        None => (None, None, None, None, None, None),
    }
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn insert(&self, member: &Member) -> Result<(), DomainError> {
        let (cycle_id, cents, currency, paid, paid_at, payment_ref) = summary_parts(member);
        sqlx::query(
            r#"
            INSERT INTO members (
                id, email, first_name, last_name, full_name, status, is_admin,
                bio, photo_url, role, company,
                dues_cycle_id, dues_amount_cents, dues_currency, dues_paid, dues_paid_at,
                dues_payment_ref, created_at, updated_at, invited_at, profile_completed_at,
                version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.email.as_str())
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.full_name)
        .bind(member.status.as_str())
        .bind(member.is_admin)
        .bind(&member.profile.bio)
        .bind(&member.profile.photo_url)
        .bind(&member.profile.role)
        .bind(&member.profile.company)
        .bind(cycle_id)
        .bind(cents)
        .bind(currency)
        .bind(paid)
        .bind(paid_at)
        .bind(payment_ref)
        .bind(member.created_at.as_datetime())
        .bind(member.updated_at.as_datetime())
        .bind(member.invited_at.map(|t| *t.as_datetime()))
        .bind(member.profile_completed_at.map(|t| *t.as_datetime()))
        .bind(member.version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "members_email_key") || violates(&e, "members_pkey") {
                return DomainError::new(ErrorCode::MemberExists, "Email already registered")
                    .with_detail("key", member.email.as_str());
            }
            db_error("Failed to insert member", e)
        })?;
        Ok(())
    }

    async fn update_if_version(&self, member: &Member, expected: i64) -> Result<bool, DomainError> {
        if write(&self.pool, member, expected).await? {
            return Ok(true);
        }
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM members WHERE id = $1")
            .bind(member.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch member", e))?;
        match exists {
            Some(_) => Ok(false),
            None => Err(DomainError::new(ErrorCode::MemberNotFound, "Member not found")
                .with_detail("key", member.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError> {
        let sql = format!("SELECT {} FROM members WHERE id = $1", COLUMNS);
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch member", e))?;
        row.map(Member::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Member>, DomainError> {
        let sql = format!("SELECT {} FROM members WHERE email = $1", COLUMNS);
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch member", e))?;
        row.map(Member::try_from).transpose()
    }

    async fn list_by_status(&self, status: MemberStatus) -> Result<Vec<Member>, DomainError> {
        let sql = format!(
            "SELECT {} FROM members WHERE status = $1 ORDER BY created_at DESC",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list members", e))?;
        rows.into_iter().map(Member::try_from).collect()
    }

    async fn list_all(&self) -> Result<Vec<Member>, DomainError> {
        let sql = format!("SELECT {} FROM members ORDER BY created_at DESC", COLUMNS);
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list members", e))?;
        rows.into_iter().map(Member::try_from).collect()
    }
}

/// Writes every mutable column when the stored version is `expected`.
async fn write(pool: &PgPool, member: &Member, expected: i64) -> Result<bool, DomainError> {
    let (cycle_id, cents, currency, paid, paid_at, payment_ref) = summary_parts(member);
    let result = sqlx::query(
        r#"
        UPDATE members SET
            first_name = $2,
            last_name = $3,
            full_name = $4,
            status = $5,
            is_admin = $6,
            bio = $7,
            photo_url = $8,
            role = $9,
            company = $10,
            dues_cycle_id = $11,
            dues_amount_cents = $12,
            dues_currency = $13,
            dues_paid = $14,
            dues_paid_at = $15,
            dues_payment_ref = $16,
            updated_at = $17,
            invited_at = $18,
            profile_completed_at = $19,
            version = $20
        WHERE id = $1 AND version = $21
        "#,
    )
    .bind(member.id.as_uuid())
    .bind(&member.first_name)
    .bind(&member.last_name)
    .bind(&member.full_name)
    .bind(member.status.as_str())
    .bind(member.is_admin)
    .bind(&member.profile.bio)
    .bind(&member.profile.photo_url)
    .bind(&member.profile.role)
    .bind(&member.profile.company)
    .bind(cycle_id)
    .bind(cents)
    .bind(currency)
    .bind(paid)
    .bind(paid_at)
    .bind(payment_ref)
    .bind(member.updated_at.as_datetime())
    .bind(member.invited_at.map(|t| *t.as_datetime()))
    .bind(member.profile_completed_at.map(|t| *t.as_datetime()))
    .bind(member.version)
    .bind(expected)
    .execute(pool)
    .await
    .map_err(|e| db_error("Failed to update member", e))?;

    Ok(result.rows_affected() > 0)
}
