//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::{AuthError, FieldErrors};

const GENERIC_LOGIN_FAILURE: &str = "Invalid username or password.";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

fn respond(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    fields: Option<FieldErrors>,
) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code,
            message: message.into(),
            fields,
        },
    };
    (status, Json(body)).into_response()
}

/// Domain error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            // Lockout is indistinguishable from a bad password to the caller.
            AuthError::InvalidCredentials | AuthError::AccountLocked => respond(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                GENERIC_LOGIN_FAILURE,
                None,
            ),
            AuthError::Validation(fields) => respond(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed",
                Some(fields),
            ),
            AuthError::DuplicateUser(_) => respond(
                StatusCode::CONFLICT,
                "DUPLICATE_USER",
                "User already exists.",
                None,
            ),
            e @ (AuthError::Configuration(_) | AuthError::Storage(_)) => {
                error!(error = %e, "Request failed");
                respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR,
                    None,
                )
            }
        }
    }
}

/// Bearer authentication or authorization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("Authorization token is required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Insufficient permissions")]
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        };
        respond(status, code, self.to_string(), None)
    }
}
