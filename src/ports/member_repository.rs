//! Member repository port.
//!
//! Implementations must enforce email uniqueness and provide a per-record
//! compare-and-set on the member's `version`.

use crate::domain::foundation::{DomainError, Email, MemberId};
use crate::domain::member::{Member, MemberStatus};
use async_trait::async_trait;

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Persist a new member.
    ///
    /// # Errors
    ///
    /// - `MemberExists` if the email is already registered
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, member: &Member) -> Result<(), DomainError>;

    /// Overwrite `member` only if the stored version is still `expected`.
    ///
    /// `member.version` is stored as given. Returns `false` when another
    /// writer got in first.
    ///
    /// # Errors
    ///
    /// - `MemberNotFound` if the member doesn't exist
    async fn update_if_version(&self, member: &Member, expected: i64) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Member>, DomainError>;

    /// Members in `status`, oldest first.
    async fn list_by_status(&self, status: MemberStatus) -> Result<Vec<Member>, DomainError>;

    /// All members, oldest first.
    async fn list_all(&self) -> Result<Vec<Member>, DomainError>;
}
