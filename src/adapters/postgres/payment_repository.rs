//! PostgreSQL implementation of PaymentRepository.
//!
//! `transition_if_pending` locks the row with `SELECT ... FOR UPDATE`, applies
//! the outcome in the domain and writes it back in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt, db_error, violates};
use crate::domain::dues::{Payment, PaymentOutcome, PaymentStatus};
use crate::domain::foundation::{
    Currency, CycleId, DomainError, Email, ErrorCode, GatewaySessionId, MemberId, Money,
    PaymentId, Timestamp,
};
use crate::ports::PaymentRepository;

const COLUMNS: &str = r#"
    id, member_id, cycle_id, email, gateway_session_id, amount_cents, currency,
    status, description, created_at, updated_at, paid_at, gateway_payment_intent_id
"#;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    member_id: Uuid,
    cycle_id: Option<String>,
    email: String,
    gateway_session_id: String,
    amount_cents: i64,
    currency: String,
    status: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    gateway_payment_intent_id: Option<String>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = Currency::parse(row.currency.trim()).map_err(|e| corrupt("currency", e))?;
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            member_id: MemberId::from_uuid(row.member_id),
            cycle_id: row
                .cycle_id
                .map(CycleId::parse)
                .transpose()
                .map_err(|e| corrupt("cycle_id", e))?,
            email: Email::parse(&row.email).map_err(|e| corrupt("email", e))?,
            gateway_session_id: GatewaySessionId::new(row.gateway_session_id)
                .map_err(|e| corrupt("gateway_session_id", e))?,
            amount: Money::new(row.amount_cents, currency).map_err(|e| corrupt("amount_cents", e))?,
            status: PaymentStatus::parse(&row.status).map_err(|e| corrupt("status", e))?,
            description: row.description,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            gateway_payment_intent_id: row.gateway_payment_intent_id,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, member_id, cycle_id, email, gateway_session_id, amount_cents, currency,
                status, description, created_at, updated_at, paid_at, gateway_payment_intent_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.member_id.as_uuid())
        .bind(payment.cycle_id.as_ref().map(|c| c.as_str()))
        .bind(payment.email.as_str())
        .bind(payment.gateway_session_id.as_str())
        .bind(payment.amount.amount_cents)
        .bind(payment.amount.currency.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.description)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(&payment.gateway_payment_intent_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "payments_gateway_session_id_key") || violates(&e, "payments_pkey") {
                return DomainError::new(ErrorCode::PaymentExists, "Payment already recorded")
                    .with_detail("key", payment.gateway_session_id.as_str());
            }
            db_error("Failed to insert payment", e)
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch payment", e))?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_by_session(
        &self,
        session_id: &GatewaySessionId,
    ) -> Result<Option<Payment>, DomainError> {
        let sql = format!("SELECT {} FROM payments WHERE gateway_session_id = $1", COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(session_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch payment", e))?;
        row.map(Payment::try_from).transpose()
    }

    async fn transition_if_pending(
        &self,
        session_id: &GatewaySessionId,
        outcome: &PaymentOutcome,
    ) -> Result<Option<Payment>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let sql = format!(
            "SELECT {} FROM payments WHERE gateway_session_id = $1 FOR UPDATE",
            COLUMNS
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(session_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock payment", e))?;

        let mut payment = match row {
            Some(row) => Payment::try_from(row)?,
            None => {
                return Err(DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("key", session_id.as_str()));
            }
        };
        if !payment.is_pending() {
            return Ok(None);
        }
        payment.apply(outcome)?;

        sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                updated_at = $3,
                paid_at = $4,
                gateway_payment_intent_id = $5
            WHERE id = $1
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(&payment.gateway_payment_intent_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update payment", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok(Some(payment))
    }

    async fn list_for_member(&self, member_id: &MemberId) -> Result<Vec<Payment>, DomainError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE member_id = $1 ORDER BY created_at DESC",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(member_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list payments", e))?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}
