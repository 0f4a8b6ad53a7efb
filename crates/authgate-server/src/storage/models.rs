//! Data models for the identity store.

use serde::{Deserialize, Serialize};

use crate::auth::claims::RoleSet;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Empty when the account has no usable password.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Comma-separated role names.
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub access_failed_count: i64,
    /// Unix timestamp until which logins are refused.
    pub lockout_end: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Identity {
    pub fn roles(&self) -> RoleSet {
        self.role.split(',').collect()
    }

    pub fn is_locked_out(&self, now: i64) -> bool {
        self.lockout_end.is_some_and(|end| end > now)
    }
}

/// Parameters for inserting a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}
