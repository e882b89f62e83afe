use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Name of the role every new account receives.
pub const DEFAULT_ROLE: &str = "User";
pub const ADMIN_ROLE: &str = "Admin";

/// Reference roles with identifiers that never change between deployments.
pub const SEED_ROLES: [(Uuid, &str, &str); 3] = [
    (
        Uuid::from_u128(0x11111111_1111_1111_1111_111111111111),
        ADMIN_ROLE,
        "Administrator with full access",
    ),
    (
        Uuid::from_u128(0x22222222_2222_2222_2222_222222222222),
        DEFAULT_ROLE,
        "Regular user",
    ),
    (
        Uuid::from_u128(0x33333333_3333_3333_3333_333333333333),
        "Seller",
        "User who can sell products",
    ),
];

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl User {
    /// A fresh, active account. Nothing is persisted here.
    pub fn new(
        email: String,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name,
            last_name,
            is_active: true,
            created_at: now,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Join row between a user and a role; `(user_id, role_id)` is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_at: OffsetDateTime,
}

/// User loaded together with the names of its roles.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user: User,
    pub roles: Vec<String>,
}

/// Partial profile update. `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileChanges {
    /// Blank values are dropped so they never overwrite a stored name.
    pub fn from_input(first_name: Option<String>, last_name: Option<String>) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }
        Self {
            first_name: keep(first_name),
            last_name: keep(last_name),
        }
    }

    pub fn apply(&self, user: &mut User, now: OffsetDateTime) {
        if let Some(first) = &self.first_name {
            user.first_name = Some(first.clone());
        }
        if let Some(last) = &self.last_name {
            user.last_name = Some(last.clone());
        }
        user.updated_at = Some(now);
    }
}
