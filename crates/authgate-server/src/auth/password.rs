//! Password hashing and verification using bcrypt.
//!
//! With enhanced entropy enabled the password is first digested with
//! SHA-384 and base64-encoded, so the full input contributes to the hash
//! despite bcrypt's 72-byte limit.

use std::borrow::Cow;

use authgate_core::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST, PasswordConfig};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha384};
use tracing::debug;

use crate::error::AuthError;

/// bcrypt hasher with a fixed cost and entropy mode.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    enhanced_entropy: bool,
    /// Hash of a random throwaway password; verifying against it keeps
    /// unknown-user lookups as slow as real ones.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32, enhanced_entropy: bool) -> Result<Self, AuthError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AuthError::Configuration(format!(
                "bcrypt cost {cost} is outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"
            )));
        }
        let throwaway = uuid::Uuid::new_v4().to_string();
        let dummy_hash = bcrypt::hash(prepare(&throwaway, enhanced_entropy).as_bytes(), cost)
            .map_err(|e| AuthError::Configuration(format!("bcrypt unavailable: {e}")))?;
        Ok(Self {
            cost,
            enhanced_entropy,
            dummy_hash,
        })
    }

    pub fn from_config(config: &PasswordConfig) -> Result<Self, AuthError> {
        Self::new(config.cost, config.enhanced_entropy)
    }

    /// Hash a password with a random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(prepare(password, self.enhanced_entropy).as_bytes(), self.cost)
            .map_err(|e| AuthError::Configuration(format!("password hashing failed: {e}")))
    }

    /// Verify a password against a stored hash. Any bcrypt error counts as a
    /// mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(prepare(password, self.enhanced_entropy).as_bytes(), hash) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, "Password verification error treated as mismatch");
                false
            }
        }
    }

    /// Spend one verification's worth of work without a stored hash.
    pub fn burn_verification(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn prepare(password: &str, enhanced_entropy: bool) -> Cow<'_, str> {
    if enhanced_entropy {
        Cow::Owned(STANDARD.encode(Sha384::digest(password.as_bytes())))
    } else {
        Cow::Borrowed(password)
    }
}

/// Check a candidate password against the complexity policy, returning one
/// message per unmet rule.
pub fn complexity_errors(password: &str, policy: &PasswordConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if password.chars().count() < policy.required_length {
        errors.push(format!(
            "Passwords must be at least {} characters.",
            policy.required_length
        ));
    }
    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Passwords must have at least one digit ('0'-'9').".to_string());
    }
    if policy.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
    }
    if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
    }
    if policy.require_non_alphanumeric && password.chars().all(char::is_alphanumeric) {
        errors.push("Passwords must have at least one non alphanumeric character.".to_string());
    }

    errors
}
