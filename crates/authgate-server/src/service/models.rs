//! Request and response bodies for the auth API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// `POST /api/auth/login` and `POST /api/account/login` body.
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// `POST /api/auth/register` body.
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 64,
        message = "The Username field must be between 3 and 64 characters."
    ))]
    pub username: String,
    /// Complexity is checked against the configured policy, not here.
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "The FirstName field must be between 1 and 100 characters."
    ))]
    pub first_name: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "The LastName field must be between 1 and 100 characters."
    ))]
    pub last_name: String,
}

/// Short-lived token issued by `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expiration: DateTime<Utc>,
}

/// Long-lived token issued by `POST /api/account/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLoginResponse {
    pub username: String,
    pub role: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Parameters for creating an identity outside of self-registration.
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}
