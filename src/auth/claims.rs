use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role the caller is authenticated as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "USER", alias = "User")]
    User,
    #[serde(alias = "ADMIN", alias = "Admin")]
    Admin,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // principal ID
    pub role: Role,  // role granted to the principal
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}
