use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ProfileChanges, Role, User, UserRole, UserWithRoles};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.constraint().unwrap_or("unknown").to_string());
            }
        }
        StoreError::Database(e)
    }
}

/// Persistence for users, roles and their assignments.
///
/// Every call is atomic on its own. Writes that must land together go
/// through [`UserStore::begin`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Exact-match lookup; also loads the user's role names.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserWithRoles>, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Applies `changes` and stamps `updated_at`; `None` if the user is gone.
    async fn update_user_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
        updated_at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    async fn find_assignment(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<UserRole>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the pair is already assigned.
    async fn insert_assignment(&self, assignment: &UserRole) -> Result<(), StoreError>;

    /// Returns whether a row was removed.
    async fn delete_assignment(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, StoreError>;

    async fn role_names_for_user(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Opens a unit of work. Dropping it without `commit` discards its writes.
    async fn begin(&self) -> Result<Box<dyn UserStoreTx>, StoreError>;
}

#[async_trait]
pub trait UserStoreTx: Send {
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;
    async fn insert_assignment(&mut self, assignment: &UserRole) -> Result<(), StoreError>;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
