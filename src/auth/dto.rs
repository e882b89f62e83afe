use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::dto::UserDto;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_NAME_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn check_name(field: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(v) if v.chars().count() > MAX_NAME_LEN => {
            Err(format!("{field} must be at most {MAX_NAME_LEN} characters"))
        }
        _ => Ok(()),
    }
}

/// Request body for user registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    /// Trims the email (case is kept: lookups are exact-match) and checks
    /// the field limits.
    pub fn normalize_and_validate(&mut self) -> Result<(), String> {
        self.email = self.email.trim().to_string();
        if self.email.chars().count() > MAX_EMAIL_LEN || !is_valid_email(&self.email) {
            return Err("Invalid email".into());
        }
        let len = self.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            return Err(format!(
                "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
            ));
        }
        check_name("first_name", self.first_name.as_deref())?;
        check_name("last_name", self.last_name.as_deref())?;
        Ok(())
    }
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after register or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: UserDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn email_is_trimmed_but_case_is_kept() {
        let mut req = request("  Alice@Example.com ", "secret1");
        req.normalize_and_validate().unwrap();
        assert_eq!(req.email, "Alice@Example.com");
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(request("not-an-email", "secret1").normalize_and_validate().is_err());
        let long = format!("{}@example.com", "a".repeat(100));
        assert!(request(&long, "secret1").normalize_and_validate().is_err());
    }

    #[test]
    fn enforces_password_length() {
        assert!(request("a@b.co", "12345").normalize_and_validate().is_err());
        assert!(request("a@b.co", "123456").normalize_and_validate().is_ok());
        assert!(request("a@b.co", &"x".repeat(101)).normalize_and_validate().is_err());
    }

    #[test]
    fn enforces_name_length() {
        let mut req = request("a@b.co", "secret1");
        req.first_name = Some("n".repeat(101));
        assert!(req.normalize_and_validate().is_err());
        assert!(check_name("last_name", Some("Lee")).is_ok());
        assert!(check_name("last_name", None).is_ok());
    }
}
