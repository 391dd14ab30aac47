//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresMemberRepository` - Members, with status compare-and-set
//! - `PostgresInvitationRepository` - Invitations, looked up by token hash
//! - `PostgresCycleRepository` - Cycles, with transactional batch activation
//! - `PostgresMemberDuesRepository` - Per-member dues, upserted by key
//! - `PostgresPaymentRepository` - Payments, unique by gateway session
//!
//! Schema lives in `migrations/`; call [`run_migrations`] at startup.

mod cycle_repository;
mod invitation_repository;
mod member_dues_repository;
mod member_repository;
mod payment_repository;

pub use cycle_repository::PostgresCycleRepository;
pub use invitation_repository::PostgresInvitationRepository;
pub use member_dues_repository::PostgresMemberDuesRepository;
pub use member_repository::PostgresMemberRepository;
pub use payment_repository::PostgresPaymentRepository;

use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Applies pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))
}

/// Wraps a sqlx error as `DatabaseError` with context.
fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    tracing::error!(error = %e, "{}", context);
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

/// True if `e` violated the named unique constraint.
fn violates(e: &sqlx::Error, constraint: &str) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}

/// A stored value that no longer parses into its domain type.
fn corrupt(column: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value in database: {}", column, e),
    )
}
