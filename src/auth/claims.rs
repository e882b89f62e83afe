use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-token payload. A verifier built elsewhere must expect exactly
/// these names, signed with HS256.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,         // user ID
    pub email: String,     // account email
    pub name: String,      // first name, or email when there is none
    #[serde(default)]
    pub role: Vec<String>, // one entry per assigned role
    pub iat: usize,        // issued at (unix timestamp)
    pub exp: usize,        // expires at (unix timestamp)
    pub iss: String,       // issuer
    pub aud: String,       // audience
}

