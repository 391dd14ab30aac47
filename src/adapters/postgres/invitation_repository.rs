//! PostgreSQL implementation of InvitationRepository.
//!
//! `mark_used` and `mark_expired` are single conditional `UPDATE`s on
//! `status = 'sent'`, so the row lock decides which caller wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt, db_error, violates};
use crate::domain::foundation::{AdminId, DomainError, Email, ErrorCode, InvitationId, MemberId, Timestamp};
use crate::domain::invitation::{Invitation, InvitationStatus, TokenHash};
use crate::ports::InvitationRepository;

const COLUMNS: &str = r#"
    id, email, first_name, last_name, token_hash, status, member_id,
    created_by, created_at, expires_at, used_at
"#;

pub struct PostgresInvitationRepository {
    pool: PgPool,
}

impl PostgresInvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvitationRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    token_hash: String,
    status: String,
    member_id: Option<Uuid>,
    created_by: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = DomainError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            id: InvitationId::from_uuid(row.id),
            email: Email::parse(&row.email).map_err(|e| corrupt("email", e))?,
            first_name: row.first_name,
            last_name: row.last_name,
            token_hash: TokenHash::from_stored(row.token_hash).map_err(|e| corrupt("token_hash", e))?,
            status: InvitationStatus::parse(&row.status).map_err(|e| corrupt("status", e))?,
            member_id: row.member_id.map(MemberId::from_uuid),
            created_by: AdminId::new(row.created_by).map_err(|e| corrupt("created_by", e))?,
            created_at: Timestamp::from_datetime(row.created_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            used_at: row.used_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    async fn insert(&self, invitation: &Invitation) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invitations (
                id, email, first_name, last_name, token_hash, status, member_id,
                created_by, created_at, expires_at, used_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invitation.id.as_uuid())
        .bind(invitation.email.as_str())
        .bind(&invitation.first_name)
        .bind(&invitation.last_name)
        .bind(invitation.token_hash.as_str())
        .bind(invitation.status.as_str())
        .bind(invitation.member_id.map(|m| *m.as_uuid()))
        .bind(invitation.created_by.as_str())
        .bind(invitation.created_at.as_datetime())
        .bind(invitation.expires_at.as_datetime())
        .bind(invitation.used_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "invitations_pkey") || violates(&e, "invitations_token_hash_key") {
                return DomainError::new(ErrorCode::InvitationExists, "Invitation already stored")
                    .with_detail("key", invitation.id.to_string());
            }
            db_error("Failed to insert invitation", e)
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: &InvitationId) -> Result<Option<Invitation>, DomainError> {
        let sql = format!("SELECT {} FROM invitations WHERE id = $1", COLUMNS);
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch invitation", e))?;
        row.map(Invitation::try_from).transpose()
    }

    async fn find_by_token_hash(&self, hash: &TokenHash) -> Result<Option<Invitation>, DomainError> {
        let sql = format!("SELECT {} FROM invitations WHERE token_hash = $1", COLUMNS);
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(hash.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch invitation", e))?;
        let invitation = row.map(Invitation::try_from).transpose()?;
        Ok(invitation.filter(|i| i.token_hash.matches(hash)))
    }

    async fn mark_used(
        &self,
        id: &InvitationId,
        member_id: &MemberId,
        used_at: Timestamp,
    ) -> Result<Option<Invitation>, DomainError> {
        let sql = format!(
            r#"
            UPDATE invitations
            SET status = 'used', member_id = $2, used_at = $3
            WHERE id = $1 AND status = 'sent'
            RETURNING {}
            "#,
            COLUMNS
        );
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id.as_uuid())
            .bind(member_id.as_uuid())
            .bind(used_at.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to mark invitation used", e))?;

        match row {
            Some(row) => Ok(Some(Invitation::try_from(row)?)),
            None if self.find_by_id(id).await?.is_some() => Ok(None),
            None => Err(DomainError::new(ErrorCode::InvitationNotFound, "Invitation not found")
                .with_detail("key", id.to_string())),
        }
    }

    async fn mark_expired(&self, id: &InvitationId) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE invitations SET status = 'expired' WHERE id = $1 AND status = 'sent'")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to expire invitation", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire_sent_before(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'expired' WHERE status = 'sent' AND expires_at <= $1",
        )
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to expire invitations", e))?;
        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> Result<Vec<Invitation>, DomainError> {
        let sql = format!("SELECT {} FROM invitations ORDER BY created_at DESC", COLUMNS);
        let rows = sqlx::query_as::<_, InvitationRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list invitations", e))?;
        rows.into_iter().map(Invitation::try_from).collect()
    }
}
