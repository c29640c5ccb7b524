//! Persistence seam for users and sessions.

use chrono::Utc;
use service_core::axum::async_trait;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{NewUser, Session, User, UserStatus, UserType};

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// Look up a user by account type and provider-qualified username.
    async fn find_user_by_type_and_username(
        &self,
        user_type: UserType,
        idp_username: &str,
    ) -> Result<Option<User>, AppError>;

    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn update_user_status(&self, user_id: Uuid, status: UserStatus)
        -> Result<User, AppError>;

    async fn create_session(&self, user_id: Uuid, access_token: &str)
        -> Result<Session, AppError>;

    async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError>;

    /// Remove a session. Deleting an unknown session is not an error.
    async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError>;
}

/// Store operations that [`MemoryStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FindUser,
    CreateUser,
    UpdateUserStatus,
    CreateSession,
    FindSession,
    DeleteSession,
}

/// In-process store used by tests and local runs without PostgreSQL.
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<Uuid, Session>>,
    failing: Mutex<HashSet<StoreOperation>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Make every later call of `operation` return a database error.
    pub fn fail_on(&self, operation: StoreOperation) -> Result<(), AppError> {
        self.failing
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .insert(operation);
        Ok(())
    }

    /// Seed a user directly, bypassing the uniqueness check.
    pub fn insert_user(&self, user: User) -> Result<(), AppError> {
        self.users
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .insert(user.id, user);
        Ok(())
    }

    pub fn users(&self) -> Result<Vec<User>, AppError> {
        let users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .values()
            .cloned()
            .collect();
        Ok(users)
    }

    pub fn sessions(&self) -> Result<Vec<Session>, AppError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .values()
            .cloned()
            .collect();
        Ok(sessions)
    }

    fn check(&self, operation: StoreOperation) -> Result<(), AppError> {
        let failing = self
            .failing
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .contains(&operation);
        if failing {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Injected failure for {:?}",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_user_by_type_and_username(
        &self,
        user_type: UserType,
        idp_username: &str,
    ) -> Result<Option<User>, AppError> {
        self.check(StoreOperation::FindUser)?;
        let user = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .values()
            .find(|u| u.user_type == user_type && u.idp_username == idp_username)
            .cloned();
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        self.check(StoreOperation::CreateUser)?;
        let mut users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?;

        let taken = users
            .values()
            .any(|u| u.user_type == user.user_type && u.idp_username == user.idp_username);
        if taken {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "User {} already exists",
                user.idp_username
            )));
        }

        let user = user.into_user(Utc::now());
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
    ) -> Result<User, AppError> {
        self.check(StoreOperation::UpdateUserStatus)?;
        let mut users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;
        user.status = status;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Session, AppError> {
        self.check(StoreOperation::CreateSession)?;
        let known_user = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .contains_key(&user_id);
        if !known_user {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "User {} not found",
                user_id
            )));
        }

        let session = Session::new(user_id, access_token.to_string());
        self.sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        self.check(StoreOperation::FindSession)?;
        let session = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .get(&session_id)
            .cloned();
        Ok(session)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError> {
        self.check(StoreOperation::DeleteSession)?;
        self.sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store mutex poisoned: {}", e))?
            .remove(&session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            user_type: UserType::Vendor,
            status: UserStatus::Active,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            job_title: String::new(),
            idp_username: username.to_string(),
        }
    }

    #[tokio::test]
    async fn lookup_is_scoped_by_user_type() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada@github")).await.unwrap();

        let vendor = store
            .find_user_by_type_and_username(UserType::Vendor, "ada@github")
            .await
            .unwrap();
        assert!(vendor.is_some());

        let gov = store
            .find_user_by_type_and_username(UserType::Government, "ada@github")
            .await
            .unwrap();
        assert!(gov.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada@github")).await.unwrap();

        let err = store.create_user(new_user("ada@github")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn session_requires_existing_user() {
        let store = MemoryStore::new();
        let err = store
            .create_session(Uuid::new_v4(), "refresh")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.sessions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_applies_to_one_operation() {
        let store = MemoryStore::new();
        store.fail_on(StoreOperation::CreateSession).unwrap();

        let user = store.create_user(new_user("ada@github")).await.unwrap();
        let err = store.create_session(user.id, "refresh").await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn deleting_unknown_session_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete_session(Uuid::new_v4()).await.is_ok());
    }
}
