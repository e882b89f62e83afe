use thiserror::Error;

use super::repo::StoreError;
use crate::auth::{jwt::TokenError, password::HashError};

/// Outcome kinds of the identity use cases. Transport mapping lives in the
/// handlers.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user with this email already exists")]
    Conflict,
    /// Unknown email and wrong password both end up here.
    #[error("invalid email or password")]
    Unauthenticated,
    #[error("user account is inactive")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for IdentityError {
    fn from(e: StoreError) -> Self {
        IdentityError::Internal(e.to_string())
    }
}

impl From<HashError> for IdentityError {
    fn from(e: HashError) -> Self {
        IdentityError::Internal(e.to_string())
    }
}

impl From<TokenError> for IdentityError {
    fn from(e: TokenError) -> Self {
        IdentityError::Internal(e.to_string())
    }
}
