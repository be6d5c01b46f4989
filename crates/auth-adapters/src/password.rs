//! Argon2-based implementation of `CredentialHasher`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use domains::{AuthError, CredentialHasher};
use tracing::warn;

/// Argon2id with the crate's default cost parameters and a random salt per
/// hash. Hashes are stored as PHC strings, so parameters travel with them.
#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("correct horse", &hash));
        assert!(!hasher.verify_password("battery staple", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = Argon2Hasher::new();
        let a = hasher.hash_password("correct horse").unwrap();
        let b = hasher.hash_password("correct horse").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!Argon2Hasher::new().verify_password("anything", "plaintext-password"));
    }
}
