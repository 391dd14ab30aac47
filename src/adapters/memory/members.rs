use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::foundation::{DomainError, Email, ErrorCode, MemberId};
use crate::domain::member::{Member, MemberStatus};
use crate::ports::MemberRepository;

fn not_found(id: &MemberId) -> DomainError {
    DomainError::new(ErrorCode::MemberNotFound, "Member not found").with_detail("key", id.to_string())
}

#[async_trait]
impl MemberRepository for InMemoryStore {
    async fn insert(&self, member: &Member) -> Result<(), DomainError> {
        self.check_members_writable()?;
        let mut state = self.state.write().await;
        if state.members.values().any(|m| m.email == member.email) {
            return Err(DomainError::new(ErrorCode::MemberExists, "Email already registered")
                .with_detail("key", member.email.as_str()));
        }
        if state.members.contains_key(&member.id) {
            return Err(DomainError::new(ErrorCode::MemberExists, "Member id already used")
                .with_detail("key", member.id.to_string()));
        }
        state.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn update_if_version(&self, member: &Member, expected: i64) -> Result<bool, DomainError> {
        self.check_members_writable()?;
        let mut state = self.state.write().await;
        let stored = state.members.get_mut(&member.id).ok_or_else(|| not_found(&member.id))?;
        if stored.version != expected {
            return Ok(false);
        }
        *stored = member.clone();
        Ok(true)
    }

    async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.members.get(id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Member>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.members.values().find(|m| &m.email == email).cloned())
    }

    async fn list_by_status(&self, status: MemberStatus) -> Result<Vec<Member>, DomainError> {
        let mut members = self.list_all().await?;
        members.retain(|m| m.status == status);
        Ok(members)
    }

    async fn list_all(&self) -> Result<Vec<Member>, DomainError> {
        self.check_available()?;
        let mut members: Vec<Member> = self.state.read().await.members.values().cloned().collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn member(email: &str) -> Member {
        Member::new(
            Email::parse(email).unwrap(),
            "A",
            "B",
            MemberStatus::PendingProfile,
            false,
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = InMemoryStore::new();
        store.insert(&member("a@x.org")).await.unwrap();

        let err = store.insert(&member("A@X.org")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::MemberExists);
    }

    #[tokio::test]
    async fn update_if_version_rejects_stale_writer() {
        let store = InMemoryStore::new();
        let m = member("a@x.org");
        store.insert(&m).await.unwrap();

        let mut first = m.clone();
        first.profile.bio = Some("first".to_string());
        first.version = 1;
        let mut second = m.clone();
        second.profile.company = Some("second".to_string());
        second.version = 1;

        assert!(store.update_if_version(&first, 0).await.unwrap());
        assert!(!store.update_if_version(&second, 0).await.unwrap());

        let stored = store.find_by_id(&m.id).await.unwrap().unwrap();
        assert_eq!(stored.profile.bio.as_deref(), Some("first"));
        assert_eq!(stored.profile.company, None);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn update_of_unknown_member_is_not_found() {
        let store = InMemoryStore::new();

        let err = store.update_if_version(&member("a@x.org"), 0).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::MemberNotFound);
    }

    #[tokio::test]
    async fn unavailable_store_fails_reads() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let err = store.list_all().await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
