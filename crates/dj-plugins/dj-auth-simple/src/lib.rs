//! # dj-auth-simple
//!
//! Argon2-based implementation of `CredentialProvider`.
//! Hashes are self-describing PHC strings, so parameters can change later
//! without invalidating stored passwords.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use dj_core::traits::CredentialProvider;
use tracing::warn;

#[derive(Default)]
pub struct Argon2Credentials {
    argon2: Argon2<'static>,
}

impl Argon2Credentials {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialProvider for Argon2Credentials {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!("no entropy for salt: {e}"))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("salt encoding failed: {e}"))?;

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok()
    }
}
