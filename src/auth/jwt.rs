use base64ct::{Base64, Encoding};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{
    config::{JwtConfig, MAX_EXPIRY_MINUTES},
    users::repo_types::User,
};

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// A signed access token together with the moment it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Mints HS256 access tokens and opaque refresh tokens.
///
/// Built once at startup from [`JwtConfig`] and shared read-only.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: TimeDuration,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: TimeDuration::minutes(cfg.expiry_minutes.clamp(1, MAX_EXPIRY_MINUTES)),
        }
    }

    pub fn issue_access_token(
        &self,
        user: &User,
        roles: &[String],
        now: OffsetDateTime,
    ) -> Result<AccessToken, TokenError> {
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let name = user
            .first_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&user.email)
            .to_string();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            name,
            role: roles.to_vec(),
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user.id, roles = ?roles, "jwt signed");
        Ok(AccessToken { token, expires_at })
    }

    /// 256 random bits, base64. Carries no claims and is not stored.
    pub fn issue_refresh_token(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Base64::encode_string(&bytes)
    }

    /// Signature, expiry, issuer and audience check for the HTTP boundary.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
