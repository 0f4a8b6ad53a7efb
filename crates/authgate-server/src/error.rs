//! Domain error taxonomy for credential verification, issuance and
//! registration.

use std::collections::BTreeMap;

use authgate_core::db::DatabaseError;

/// Validation messages keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown user or wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The store reports the identity as locked out.
    #[error("Account is locked out")]
    AccountLocked,

    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Missing secret, missing role or another programming/deployment error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl AuthError {
    /// A validation error carrying a single message for `field`.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let key = camel_case(&field);
            let messages = fields.entry(key).or_default();
            for e in errs {
                messages.push(e.message.as_ref().map_or_else(
                    || format!("The {field} field is invalid."),
                    ToString::to_string,
                ));
            }
        }
        Self::Validation(fields)
    }
}

/// Request bodies use camelCase keys; report field errors under the same
/// names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
