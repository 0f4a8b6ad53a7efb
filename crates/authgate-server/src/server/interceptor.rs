//! Bearer token extraction and role checks for HTTP handlers.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::error::AuthRejection;
use crate::auth::claims::{Claims, roles};
use crate::auth::{InvalidToken, TokenValidator};

/// Claims of a request carrying a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<TokenValidator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthRejection::MissingToken)?;

        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthRejection::InvalidToken)?;

        let validator = Arc::<TokenValidator>::from_ref(state);
        let claims = validator.validate(token).map_err(|e| {
            debug!(reason = %e, "Bearer token rejected");
            match e {
                InvalidToken::Expired => AuthRejection::TokenExpired,
                _ => AuthRejection::InvalidToken,
            }
        })?;

        Ok(Self(claims))
    }
}

/// Fail with [`AuthRejection::Forbidden`] unless `claims` carries `role`.
pub fn require_role(claims: &Claims, role: &str) -> Result<(), AuthRejection> {
    if claims.has_role(role) {
        Ok(())
    } else {
        debug!(user_id = %claims.sub, required = role, "Role check failed");
        Err(AuthRejection::Forbidden)
    }
}

/// A role name known at compile time.
pub trait RequiredRole {
    const ROLE: &'static str;
}

pub struct Admin;
pub struct User;
pub struct Guest;

impl RequiredRole for Admin {
    const ROLE: &'static str = roles::ADMIN;
}

impl RequiredRole for User {
    const ROLE: &'static str = roles::USER;
}

impl RequiredRole for Guest {
    const ROLE: &'static str = roles::GUEST;
}

/// Claims of an authenticated request whose token grants role `R`.
#[derive(Debug, Clone)]
pub struct Authorized<R>(pub Claims, PhantomData<R>);

impl<R, S> FromRequestParts<S> for Authorized<R>
where
    R: RequiredRole,
    Arc<TokenValidator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(claims) = Authenticated::from_request_parts(parts, state).await?;
        require_role(&claims, R::ROLE)?;
        Ok(Self(claims, PhantomData))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::claims::RoleSet;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: "u1".into(),
            jti: "j1".into(),
            name: "alice".into(),
            role: RoleSet::single(role),
            iat: 0,
            exp: i64::MAX,
            iss: None,
            aud: None,
        }
    }

    #[test]
    fn role_present_passes() {
        assert!(require_role(&claims("Admin"), Admin::ROLE).is_ok());
    }

    #[test]
    fn role_absent_is_forbidden() {
        assert_eq!(
            require_role(&claims("User"), Admin::ROLE),
            Err(AuthRejection::Forbidden)
        );
        assert_eq!(
            require_role(&claims("Guest"), User::ROLE),
            Err(AuthRejection::Forbidden)
        );
    }
}
