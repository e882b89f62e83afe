use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{StoreError, UserStore, UserStoreTx};
use super::repo_types::{ProfileChanges, Role, User, UserRole, UserWithRoles};

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserWithRoles>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        match user {
            Some(user) => {
                let roles = self.role_names_for_user(user.id).await?;
                Ok(Some(UserWithRoles { user, roles }))
            }
            None => Ok(None),
        }
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
        updated_at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                updated_at = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(updated_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(role)
    }

    async fn find_assignment(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<UserRole>, StoreError> {
        let row = sqlx::query_as::<_, UserRole>(
            r#"
            SELECT user_id, role_id, assigned_at
            FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_assignment(&self, assignment: &UserRole) -> Result<(), StoreError> {
        insert_assignment_query(assignment).execute(&self.db).await?;
        Ok(())
    }

    async fn delete_assignment(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn role_names_for_user(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.assigned_at, r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(names)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn UserStoreTx>, StoreError> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgUserStoreTx { tx }))
    }
}

/// Wraps a live transaction; sqlx rolls it back when dropped uncommitted.
struct PgUserStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserStoreTx for PgUserStoreTx {
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, password_hash, first_name, last_name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.first_name.as_deref())
        .bind(user.last_name.as_deref())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_assignment(&mut self, assignment: &UserRole) -> Result<(), StoreError> {
        insert_assignment_query(assignment)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn insert_assignment_query(
    assignment: &UserRole,
) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query("INSERT INTO user_roles (user_id, role_id, assigned_at) VALUES ($1, $2, $3)")
        .bind(assignment.user_id)
        .bind(assignment.role_id)
        .bind(assignment.assigned_at)
}
