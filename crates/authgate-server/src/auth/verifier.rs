//! Credential verification against the identity store.

use std::sync::Arc;

use authgate_core::config::LockoutConfig;
use authgate_core::db::unix_timestamp;
use tracing::{debug, info, warn};

use super::password::PasswordHasher;
use crate::error::AuthError;
use crate::storage::{Identity, IdentityDatabase};

/// Outcome of checking a username/password pair.
#[derive(Debug, Clone)]
pub enum Verification {
    UnknownUser,
    /// The identity is locked; the password was not checked.
    LockedOut(Identity),
    WrongPassword(Identity),
    Verified(Identity),
}

impl Verification {
    /// The authenticated identity, if verification succeeded.
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Verified(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Looks up identities and checks passwords, maintaining lockout counters.
#[derive(Clone)]
pub struct CredentialVerifier {
    db: IdentityDatabase,
    hasher: Arc<PasswordHasher>,
    lockout: LockoutConfig,
}

impl CredentialVerifier {
    pub fn new(
        db: IdentityDatabase,
        hasher: Arc<PasswordHasher>,
        lockout: LockoutConfig,
    ) -> Self {
        Self { db, hasher, lockout }
    }

    /// Return the stored identity when `password` matches, `None` otherwise.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, AuthError> {
        Ok(self.verify(username, password).await?.into_identity())
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<Verification, AuthError> {
        let identity = match self.db.find_identity_by_username(username).await? {
            Some(identity) if !identity.password_hash.is_empty() => identity,
            _ => {
                self.hasher.burn_verification(password);
                debug!(username, "Login for unknown user");
                return Ok(Verification::UnknownUser);
            }
        };

        if self.lockout.enabled && identity.is_locked_out(unix_timestamp()) {
            self.hasher.burn_verification(password);
            warn!(username, user_id = %identity.id, "Login attempt on locked-out account");
            return Ok(Verification::LockedOut(identity));
        }

        if !self.hasher.verify(password, &identity.password_hash) {
            let locked_now = self
                .db
                .record_failed_login(&identity.id, &self.lockout)
                .await?;
            if locked_now {
                warn!(username, user_id = %identity.id, "Account locked after repeated failures");
            } else {
                debug!(username, user_id = %identity.id, "Wrong password");
            }
            return Ok(Verification::WrongPassword(identity));
        }

        if identity.access_failed_count > 0 || identity.lockout_end.is_some() {
            self.db.reset_failed_logins(&identity.id).await?;
        }
        info!(username, user_id = %identity.id, "Credentials verified");
        Ok(Verification::Verified(identity))
    }
}
