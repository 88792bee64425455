use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::{config::Argon2Config, error::AppError};

pub const MIN_SECRET_LEN: usize = 8;

/// Stored, one-way representation of an account secret (a PHC string).
///
/// Only [`CredentialHandler::derive`] and the store loading rows back can
/// build one, so plaintext never ends up in a user record.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub(crate) fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Derives and verifies credentials with Argon2id.
#[derive(Clone)]
pub struct CredentialHandler {
    argon2: Argon2<'static>,
}

impl CredentialHandler {
    pub fn new(cfg: &Argon2Config) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn derive(&self, plain: &str) -> Result<Credential, AppError> {
        if plain.is_empty() {
            return Err(AppError::InvalidSecret("Password must not be empty".into()));
        }
        if plain.chars().count() < MIN_SECRET_LEN {
            return Err(AppError::InvalidSecret("Password too short".into()));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(Credential(hash))
    }

    /// Parameters are read from the PHC string, so hashes made under older
    /// settings still verify.
    pub fn verify(&self, plain: &str, credential: &Credential) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(credential.as_str()).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(self
            .argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}
