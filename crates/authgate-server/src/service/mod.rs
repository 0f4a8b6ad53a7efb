//! Login, registration and account administration on top of the identity
//! store and token issuers.

pub mod models;


use std::sync::Arc;

use authgate_core::Config;
use authgate_core::config::PasswordConfig;
use authgate_core::db::DatabaseError;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use validator::{Validate, ValidateEmail};

use crate::auth::claims::{RoleSet, roles};
use crate::auth::password::{self, PasswordHasher};
use crate::auth::{CredentialVerifier, IssuedToken, SigningKey, TokenIssuer, Verification};
use crate::error::{AuthError, FieldErrors};
use crate::storage::{Identity, IdentityDatabase, NewIdentity};
use models::{
    AccountLoginResponse, LoginRequest, LoginResponse, MessageResponse, NewAccount,
    RegisterRequest,
};

pub struct AuthService {
    db: IdentityDatabase,
    verifier: CredentialVerifier,
    hasher: Arc<PasswordHasher>,
    access_issuer: TokenIssuer,
    standard_issuer: TokenIssuer,
    password_policy: PasswordConfig,
}

impl AuthService {
    pub fn new(
        db: IdentityDatabase,
        key: Arc<SigningKey>,
        config: &Config,
    ) -> Result<Self, AuthError> {
        let hasher = Arc::new(PasswordHasher::from_config(&config.password)?);
        let verifier =
            CredentialVerifier::new(db.clone(), Arc::clone(&hasher), config.lockout.clone());
        Ok(Self {
            db,
            verifier,
            hasher,
            access_issuer: TokenIssuer::access(Arc::clone(&key), &config.jwt)?,
            standard_issuer: TokenIssuer::standard(key, &config.jwt)?,
            password_policy: config.password.clone(),
        })
    }

    /// Verify credentials and issue a short-lived access token.
    #[instrument(skip_all, fields(username = %req.username))]
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let identity = self.verify_credentials(req).await?;
        let issued = self.issue(&self.access_issuer, &identity)?;
        let expiration = DateTime::<Utc>::from_timestamp(issued.expires_at, 0).ok_or_else(|| {
            AuthError::Configuration(format!("expiry {} out of range", issued.expires_at))
        })?;

        Ok(LoginResponse {
            token: issued.token,
            expiration,
        })
    }

    /// Verify credentials and issue a long-lived token.
    #[instrument(skip_all, fields(username = %req.username))]
    pub async fn account_login(
        &self,
        req: &LoginRequest,
    ) -> Result<AccountLoginResponse, AuthError> {
        let identity = self.verify_credentials(req).await?;
        let issued = self.issue(&self.standard_issuer, &identity)?;

        Ok(AccountLoginResponse {
            username: identity.username,
            role: identity.role,
            token: issued.token,
        })
    }

    /// Self-registration. New identities always get the `User` role.
    #[instrument(skip_all, fields(username = %req.username))]
    pub async fn register(&self, req: &RegisterRequest) -> Result<MessageResponse, AuthError> {
        let mut fields = match req.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => match AuthError::from(errors) {
                AuthError::Validation(fields) => fields,
                other => return Err(other),
            },
        };

        let identity = self
            .create_account(
                &NewAccount {
                    username: &req.username,
                    password: &req.password,
                    email: &req.email,
                    role: roles::USER,
                    first_name: &req.first_name,
                    last_name: &req.last_name,
                },
                &mut fields,
            )
            .await?;

        info!(user_id = %identity.id, "User registered");
        Ok(MessageResponse {
            message: "User registered successfully.".into(),
        })
    }

    /// Create an identity with an explicit role (operator bootstrap).
    #[instrument(skip_all, fields(username = %account.username, role = %account.role))]
    pub async fn create_identity(&self, account: &NewAccount<'_>) -> Result<Identity, AuthError> {
        let mut fields = FieldErrors::new();
        if account.username.trim().is_empty() {
            fields
                .entry("username".into())
                .or_default()
                .push("Username is required.".into());
        }
        if !account.email.validate_email() {
            fields
                .entry("email".into())
                .or_default()
                .push("The Email field is not a valid e-mail address.".into());
        }
        let identity = self.create_account(account, &mut fields).await?;
        info!(user_id = %identity.id, "Identity created");
        Ok(identity)
    }

    /// Replace the role list of the identity named `username`.
    #[instrument(skip(self))]
    pub async fn set_role(&self, username: &str, role: &str) -> Result<Identity, AuthError> {
        let role_set = parse_roles(role)?;
        let identity = self
            .db
            .find_identity_by_username(username)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Identity with username {username}")))?;

        let updated = self.db.set_role(&identity.id, &role_set.to_string()).await?;
        info!(user_id = %updated.id, role = %updated.role, "Role updated");
        Ok(updated)
    }

    async fn verify_credentials(&self, req: &LoginRequest) -> Result<Identity, AuthError> {
        req.validate()?;

        match self.verifier.verify(&req.username, &req.password).await? {
            Verification::Verified(identity) => Ok(identity),
            Verification::LockedOut(_) => Err(AuthError::AccountLocked),
            Verification::UnknownUser | Verification::WrongPassword(_) => {
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn issue(&self, issuer: &TokenIssuer, identity: &Identity) -> Result<IssuedToken, AuthError> {
        let issued = issuer.issue(&identity.id, &identity.username, &identity.roles())?;
        info!(user_id = %identity.id, jti = %issued.jti, "Token issued");
        Ok(issued)
    }

    /// Validate, check uniqueness, hash and insert. `fields` carries any
    /// validation messages already collected by the caller.
    ///
    /// Malformed attributes are reported first. Once they are well formed a
    /// taken username wins over role and password policy errors.
    async fn create_account(
        &self,
        account: &NewAccount<'_>,
        fields: &mut FieldErrors,
    ) -> Result<Identity, AuthError> {
        if !fields.is_empty() {
            self.policy_errors(account, fields);
            return Err(AuthError::Validation(std::mem::take(fields)));
        }

        if self
            .db
            .find_identity_by_username(account.username)
            .await?
            .is_some()
        {
            warn!("Registration for existing username");
            return Err(AuthError::DuplicateUser(account.username.to_string()));
        }

        let role_set = self.policy_errors(account, fields);
        if !fields.is_empty() {
            return Err(AuthError::Validation(std::mem::take(fields)));
        }

        if self.db.find_identity_by_email(account.email).await?.is_some() {
            return Err(AuthError::field(
                "email",
                format!("Email '{}' is already taken.", account.email),
            ));
        }

        let hash = self.hasher.hash(account.password)?;
        let id = uuid::Uuid::new_v4().to_string();
        let role = role_set.to_string();
        let new = NewIdentity {
            id: &id,
            username: account.username,
            email: account.email,
            password_hash: &hash,
            role: &role,
            first_name: account.first_name,
            last_name: account.last_name,
        };

        match self.db.create_identity(&new).await {
            Ok(identity) => Ok(identity),
            // Lost a race with a concurrent registration.
            Err(DatabaseError::Conflict(_)) => {
                Err(AuthError::DuplicateUser(account.username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Merge role and password policy errors into `fields`.
    fn policy_errors(&self, account: &NewAccount<'_>, fields: &mut FieldErrors) -> RoleSet {
        let role_set = match parse_roles(account.role) {
            Ok(set) => set,
            Err(e) => {
                if let AuthError::Validation(errors) = e {
                    fields.extend(errors);
                }
                RoleSet::new()
            }
        };

        let complexity = password::complexity_errors(account.password, &self.password_policy);
        if !complexity.is_empty() {
            fields.entry("password".into()).or_default().extend(complexity);
        }
        role_set
    }
}

fn parse_roles(role: &str) -> Result<RoleSet, AuthError> {
    let set: RoleSet = role.split(',').collect();
    if set.is_empty() {
        return Err(AuthError::field("role", "Role is required."));
    }
    Ok(set)
}
