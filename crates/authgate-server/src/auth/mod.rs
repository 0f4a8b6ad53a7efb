//! Authentication module for authgate.
//!
//! Credential verification, bcrypt password hashing, and JWT issuance and
//! validation.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod verifier;

pub use claims::{Claims, RoleSet};
pub use jwt::{InvalidToken, IssuedToken, SigningKey, TokenIssuer, TokenValidator};
pub use password::PasswordHasher;
pub use verifier::{CredentialVerifier, Verification};
