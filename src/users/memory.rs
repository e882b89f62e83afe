//! In-memory `UserStore` used by service and router tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{StoreError, UserStore, UserStoreTx};
use super::repo_types::{ProfileChanges, Role, User, UserRole, UserWithRoles, SEED_ROLES};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    assignments: HashMap<(Uuid, Uuid), UserRole>,
    fail_tx_assignment: bool,
    stale_next_lookup: bool,
    stale_next_email_check: bool,
}

impl State {
    fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn insert_assignment(&mut self, a: &UserRole) -> Result<(), StoreError> {
        let key = (a.user_id, a.role_id);
        if self.assignments.contains_key(&key) {
            return Err(StoreError::Conflict("user_roles_pkey".into()));
        }
        self.assignments.insert(key, a.clone());
        Ok(())
    }

    /// Same order as the SQL store: assignment time, then role name.
    fn role_names(&self, user_id: Uuid) -> Vec<String> {
        let mut rows: Vec<(OffsetDateTime, &str)> = self
            .assignments
            .values()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| {
                self.roles
                    .get(&a.role_id)
                    .map(|r| (a.assigned_at, r.name.as_str()))
            })
            .collect();
        rows.sort();
        rows.into_iter().map(|(_, name)| name.to_string()).collect()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryUserStore {
    /// Store preloaded with the three reference roles.
    pub fn seeded() -> Self {
        let store = Self::default();
        {
            let mut st = store.state.lock().unwrap();
            let now = OffsetDateTime::now_utc();
            for (id, name, description) in SEED_ROLES {
                st.roles.insert(
                    id,
                    Role {
                        id,
                        name: name.to_string(),
                        description: Some(description.to_string()),
                        created_at: now,
                    },
                );
            }
        }
        store
    }

    pub fn set_active(&self, user_id: Uuid, active: bool) {
        if let Some(user) = self.state.lock().unwrap().users.get_mut(&user_id) {
            user.is_active = active;
        }
    }

    pub fn remove_role(&self, name: &str) {
        self.state.lock().unwrap().roles.retain(|_, r| r.name != name);
    }

    /// The next `find_assignment` reports nothing, as if another writer
    /// inserted the row right after the read.
    pub fn stale_next_assignment_lookup(&self) {
        self.state.lock().unwrap().stale_next_lookup = true;
    }

    /// The next `email_exists` answers `false`, as if a concurrent
    /// registration had not committed yet.
    pub fn stale_next_email_check(&self) {
        self.state.lock().unwrap().stale_next_email_check = true;
    }

    /// Makes the next transactional assignment insert fail.
    pub fn fail_next_tx_assignment(&self) {
        self.state.lock().unwrap().fail_tx_assignment = true;
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn assignment_count(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .assignments
            .keys()
            .filter(|(u, _)| *u == user_id)
            .count()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().unwrap().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserWithRoles>, StoreError> {
        let st = self.state.lock().unwrap();
        Ok(st
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| UserWithRoles {
                user: u.clone(),
                roles: st.role_names(u.id),
            }))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let mut st = self.state.lock().unwrap();
        if std::mem::take(&mut st.stale_next_email_check) {
            return Ok(false);
        }
        Ok(st.users.values().any(|u| u.email == email))
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
        updated_at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let mut st = self.state.lock().unwrap();
        Ok(st.users.get_mut(&id).map(|user| {
            changes.apply(user, updated_at);
            user.clone()
        }))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn find_assignment(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<UserRole>, StoreError> {
        let mut st = self.state.lock().unwrap();
        if std::mem::take(&mut st.stale_next_lookup) {
            return Ok(None);
        }
        Ok(st.assignments.get(&(user_id, role_id)).cloned())
    }

    async fn insert_assignment(&self, assignment: &UserRole) -> Result<(), StoreError> {
        self.state.lock().unwrap().insert_assignment(assignment)
    }

    async fn delete_assignment(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .assignments
            .remove(&(user_id, role_id))
            .is_some())
    }

    async fn role_names_for_user(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(self.state.lock().unwrap().role_names(user_id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn UserStoreTx>, StoreError> {
        Ok(Box::new(InMemoryTx {
            state: Arc::clone(&self.state),
            users: Vec::new(),
            assignments: Vec::new(),
        }))
    }
}

/// Buffers writes and applies them all-or-nothing on commit.
struct InMemoryTx {
    state: Arc<Mutex<State>>,
    users: Vec<User>,
    assignments: Vec<UserRole>,
}

#[async_trait]
impl UserStoreTx for InMemoryTx {
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        let taken = self.state.lock().unwrap().users.values().any(|u| u.email == user.email)
            || self.users.iter().any(|u| u.email == user.email);
        if taken {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        self.users.push(user.clone());
        Ok(())
    }

    async fn insert_assignment(&mut self, assignment: &UserRole) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        if std::mem::take(&mut st.fail_tx_assignment) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.assignments.push(assignment.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        let mut staged = State {
            users: st.users.clone(),
            roles: st.roles.clone(),
            assignments: st.assignments.clone(),
            fail_tx_assignment: st.fail_tx_assignment,
            stale_next_lookup: st.stale_next_lookup,
            stale_next_email_check: st.stale_next_email_check,
        };
        for user in &self.users {
            staged.insert_user(user)?;
        }
        for a in &self.assignments {
            staged.insert_assignment(a)?;
        }
        *st = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_names_break_timestamp_ties_by_name() {
        let store = InMemoryUserStore::seeded();
        let user_id = Uuid::new_v4();
        let at = OffsetDateTime::now_utc();
        for name in ["User", "Seller", "Admin"] {
            let role = store.find_role_by_name(name).await.unwrap().unwrap();
            store
                .insert_assignment(&UserRole {
                    user_id,
                    role_id: role.id,
                    assigned_at: at,
                })
                .await
                .unwrap();
        }

        let names = store.role_names_for_user(user_id).await.unwrap();
        assert_eq!(names, vec!["Admin", "Seller", "User"]);
    }
}
