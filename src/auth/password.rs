use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Argon2id hashing with per-call random salts. Output is a PHC string
/// (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so verification needs
/// nothing but the string itself.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    decoy: String,
}

impl CredentialHasher {
    pub fn new() -> Result<Self, HashError> {
        Self::with_params(Params::default())
    }

    /// Verification always uses the parameters embedded in the stored hash,
    /// so changing these only affects new hashes.
    pub fn with_params(params: Params) -> Result<Self, HashError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy = hash_with(&argon2, "decoy-password-never-matches")?;
        Ok(Self { argon2, decoy })
    }

    pub fn hash(&self, plain: &str) -> Result<String, HashError> {
        hash_with(&self.argon2, plain)
    }

    /// Never fails: a hash that does not parse simply does not match.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burns the same work as a real check. Used when there is no account,
    /// so a missing email costs as much as a wrong password.
    pub fn verify_decoy(&self, plain: &str) -> bool {
        self.verify(plain, &self.decoy)
    }
}

fn hash_with(argon2: &Argon2<'static>, plain: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            HashError(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Low-cost hasher so the test suite stays fast.
#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    CredentialHasher::with_params(params).expect("hasher should build")
}
