//! Identity and credential collaborators.
//!
//! Token format and session storage live outside this crate; callers plug
//! in a `SessionVerifier` that turns a raw authorization value into a user id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use birthday_core::UserId;

/// User id proven by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedSubject(pub UserId);

impl AuthenticatedSubject {
    pub fn user_id(self) -> UserId {
        self.0
    }
}

/// Resolves an authorization token to a subject.
pub trait SessionVerifier {
    /// Returns `None` for malformed, expired or unknown tokens.
    fn verify(&self, token: &str) -> Option<AuthenticatedSubject>;
}

/// Turns plaintext passwords into opaque stored hashes and back.
pub trait CredentialHasher {
    fn hash(&self, password: &str) -> Result<String, String>;
    /// `Ok(false)` on mismatch, `Err` when `hash` is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, String>;
}

/// Argon2id hasher producing PHC-format strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2CredentialHasher;

impl CredentialHasher for Argon2CredentialHasher {
    fn hash(&self, password: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| format!("failed to hash password: {err}"))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, String> {
        let parsed =
            PasswordHash::new(hash).map_err(|err| format!("invalid password hash: {err}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
