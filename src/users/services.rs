use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{UpdateUserRequest, UserDto},
    errors::IdentityError,
    repo::{StoreError, UserStore},
    repo_types::{ProfileChanges, Role, User, UserRole, UserWithRoles, DEFAULT_ROLE},
};
use crate::auth::{
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    jwt::TokenIssuer,
    password::CredentialHasher,
};

/// Registration, login, profile and role use cases.
///
/// Operations take plain user ids; whoever calls them has already
/// authenticated the caller. The service keeps no mutable state of its own:
/// uniqueness and race safety come from the store's constraints.
pub struct IdentityService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: Arc<TokenIssuer>,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub async fn store_ready(&self) -> Result<(), IdentityError> {
        self.store.ping().await?;
        Ok(())
    }

    /// Creates the account and its default role in one transaction, then
    /// mints credentials for it.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, IdentityError> {
        if self.store.email_exists(&req.email).await? {
            warn!("email already registered");
            return Err(IdentityError::Conflict);
        }

        let default_role = self.default_role().await?;
        let hash = self.hash_password(req.password).await?;

        let now = OffsetDateTime::now_utc();
        let user = User::new(
            req.email,
            hash,
            non_blank(req.first_name),
            non_blank(req.last_name),
            now,
        );
        let assignment = UserRole {
            user_id: user.id,
            role_id: default_role.id,
            assigned_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_user(&user).await.map_err(registration_error)?;
        tx.insert_assignment(&assignment)
            .await
            .map_err(registration_error)?;
        // minted before commit so a signing failure leaves no account behind
        let response = self.issue_credentials(&user, vec![default_role.name], now)?;
        tx.commit().await.map_err(registration_error)?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(response)
    }

    /// Unknown email and wrong password fail identically. An inactive
    /// account is only reported once the password has matched.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, IdentityError> {
        let found = self.store.find_user_by_email(&req.email).await?;

        let Some(UserWithRoles { user, roles }) = found else {
            self.verify_password(req.password, None).await?;
            warn!("login unknown email");
            return Err(IdentityError::Unauthenticated);
        };

        let ok = self
            .verify_password(req.password, Some(user.password_hash.clone()))
            .await?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(IdentityError::Unauthenticated);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login to inactive account");
            return Err(IdentityError::Forbidden);
        }

        info!(user_id = %user.id, email = %user.email, "user logged in");
        self.issue_credentials(&user, roles, OffsetDateTime::now_utc())
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserDto, IdentityError> {
        let user = self.require_user(user_id).await?;
        let roles = self.store.role_names_for_user(user.id).await?;

        debug!(user_id = %user.id, "profile loaded");
        Ok(UserDto::new(&user, roles))
    }

    /// Partial update: only present, non-blank names are written.
    #[instrument(skip(self, req))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserDto, IdentityError> {
        let changes = ProfileChanges::from_input(req.first_name, req.last_name);
        let user = self
            .store
            .update_user_profile(user_id, &changes, OffsetDateTime::now_utc())
            .await?
            .ok_or(IdentityError::NotFound("user"))?;
        let roles = self.store.role_names_for_user(user.id).await?;

        info!(user_id = %user.id, "user updated");
        Ok(UserDto::new(&user, roles))
    }

    /// `Ok(false)` when the user already holds the role, including when a
    /// concurrent writer got there first.
    #[instrument(skip(self))]
    pub async fn assign_role(&self, user_id: Uuid, role_name: &str) -> Result<bool, IdentityError> {
        let user = self.require_user(user_id).await?;
        let role = self.require_role(role_name).await?;

        if self.store.find_assignment(user.id, role.id).await?.is_some() {
            return Ok(false);
        }

        let assignment = UserRole {
            user_id: user.id,
            role_id: role.id,
            assigned_at: OffsetDateTime::now_utc(),
        };
        match self.store.insert_assignment(&assignment).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                warn!(user_id = %user.id, role = %role.name, "role assigned concurrently");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, role = %role.name, "role assigned");
        Ok(true)
    }

    /// `Ok(false)` when the user does not hold the role.
    #[instrument(skip(self))]
    pub async fn remove_role(&self, user_id: Uuid, role_name: &str) -> Result<bool, IdentityError> {
        let user = self.require_user(user_id).await?;
        let role = self.require_role(role_name).await?;

        if !self.store.delete_assignment(user.id, role.id).await? {
            return Ok(false);
        }

        info!(user_id = %user.id, role = %role.name, "role removed");
        Ok(true)
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User, IdentityError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(IdentityError::NotFound("user"))
    }

    async fn require_role(&self, name: &str) -> Result<Role, IdentityError> {
        self.store
            .find_role_by_name(name)
            .await?
            .ok_or(IdentityError::NotFound("role"))
    }

    async fn default_role(&self) -> Result<Role, IdentityError> {
        match self.store.find_role_by_name(DEFAULT_ROLE).await? {
            Some(role) => Ok(role),
            None => {
                error!(role = DEFAULT_ROLE, "seed role missing; was the database seeded?");
                Err(IdentityError::Internal(format!(
                    "seed role {DEFAULT_ROLE} is missing"
                )))
            }
        }
    }

    fn issue_credentials(
        &self,
        user: &User,
        roles: Vec<String>,
        now: OffsetDateTime,
    ) -> Result<AuthResponse, IdentityError> {
        let access = self.tokens.issue_access_token(user, &roles, now)?;
        Ok(AuthResponse {
            access_token: access.token,
            refresh_token: self.tokens.issue_refresh_token(),
            expires_at: access.expires_at,
            user: UserDto::new(user, roles),
        })
    }

    async fn hash_password(&self, plain: String) -> Result<String, IdentityError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| IdentityError::Internal(e.to_string()))??;
        Ok(hash)
    }

    /// With no stored hash the decoy is checked instead, so the caller
    /// spends the same time either way.
    async fn verify_password(
        &self,
        plain: String,
        hash: Option<String>,
    ) -> Result<bool, IdentityError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&plain, &hash),
            None => hasher.verify_decoy(&plain),
        })
        .await
        .map_err(|e| IdentityError::Internal(e.to_string()))
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn registration_error(e: StoreError) -> IdentityError {
    match e {
        StoreError::Conflict(_) => IdentityError::Conflict,
        other => other.into(),
    }
}
