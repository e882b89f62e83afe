use serde::Deserialize;

/// Development-only signing secret. Anyone who knows it can forge tokens,
/// so never run a production deployment without `JWT_SECRET`.
pub const INSECURE_DEFAULT_SECRET: &str = "YourSuperSecretKeyThatShouldBeAtLeast32CharactersLong!";

pub const DEFAULT_ISSUER: &str = "UserService";
pub const DEFAULT_AUDIENCE: &str = "UserService";
pub const DEFAULT_EXPIRY_MINUTES: i64 = 60;
/// One year. Longer lifetimes are rejected and the default is used instead.
pub const MAX_EXPIRY_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: INSECURE_DEFAULT_SECRET.into(),
            issuer: DEFAULT_ISSUER.into(),
            audience: DEFAULT_AUDIENCE.into(),
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
        }
    }
}

impl JwtConfig {
    pub fn uses_insecure_secret(&self) -> bool {
        self.secret == INSECURE_DEFAULT_SECRET
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            secret: lookup("JWT_SECRET").unwrap_or_else(|| INSECURE_DEFAULT_SECRET.into()),
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.into()),
            expiry_minutes: lookup("JWT_EXPIRY_MINUTES")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|m| (1..=MAX_EXPIRY_MINUTES).contains(m))
                .unwrap_or(DEFAULT_EXPIRY_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig::from_lookup(|key| std::env::var(key).ok());
        Ok(Self { database_url, jwt })
    }
}
