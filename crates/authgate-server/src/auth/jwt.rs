//! JWT token issuance and validation.

use std::fmt;
use std::sync::Arc;

use authgate_core::config::JwtConfig;
use authgate_core::db::unix_timestamp;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::warn;

use super::claims::{Claims, RoleSet};
use crate::error::AuthError;

/// Secrets shorter than this still work but are flagged at startup.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Process-wide HMAC-SHA256 key, built once from configuration.
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_secret(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "JWT signing secret is empty".into(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    /// Build the key from `Jwt.Secret`, failing when it is not configured.
    pub fn from_config(config: &JwtConfig) -> Result<Self, AuthError> {
        let secret = config
            .secret()
            .map_err(|e| AuthError::Configuration(e.to_string()))?;
        if secret.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                min_len = RECOMMENDED_SECRET_LEN,
                "Jwt.Secret is shorter than recommended for HS256"
            );
        }
        Self::from_secret(secret.as_bytes())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Issues signed, time-bounded bearer tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    issuer: Option<String>,
    audience: Option<String>,
    lifetime_secs: i64,
}

impl TokenIssuer {
    pub fn new(
        key: Arc<SigningKey>,
        issuer: Option<String>,
        audience: Option<String>,
        lifetime_minutes: i64,
    ) -> Result<Self, AuthError> {
        let lifetime_secs = lifetime_minutes.checked_mul(60).ok_or_else(|| {
            AuthError::Configuration(format!(
                "token lifetime of {lifetime_minutes} minutes overflows"
            ))
        })?;
        Ok(Self {
            key,
            issuer,
            audience,
            lifetime_secs,
        })
    }

    /// Short-lived issuer (`Jwt.AccessTokenExpiryMinutes`).
    pub fn access(key: Arc<SigningKey>, config: &JwtConfig) -> Result<Self, AuthError> {
        Self::new(
            key,
            config.issuer.clone(),
            config.audience.clone(),
            config.access_token_expiry_minutes,
        )
    }

    /// Generic issuer (`Jwt.ExpireMinutes`).
    pub fn standard(key: Arc<SigningKey>, config: &JwtConfig) -> Result<Self, AuthError> {
        Self::new(
            key,
            config.issuer.clone(),
            config.audience.clone(),
            config.expire_minutes,
        )
    }

    pub const fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issue a token for the given identity.
    pub fn issue(
        &self,
        identity_id: &str,
        username: &str,
        roles: &RoleSet,
    ) -> Result<IssuedToken, AuthError> {
        self.issue_at(unix_timestamp(), identity_id, username, roles)
    }

    pub(crate) fn issue_at(
        &self,
        now: i64,
        identity_id: &str,
        username: &str,
        roles: &RoleSet,
    ) -> Result<IssuedToken, AuthError> {
        if roles.is_empty() {
            return Err(AuthError::Configuration(format!(
                "identity {identity_id} has no role"
            )));
        }
        if self.lifetime_secs <= 0 {
            return Err(AuthError::Configuration(
                "token lifetime must be positive".into(),
            ));
        }

        let exp = now.checked_add(self.lifetime_secs).ok_or_else(|| {
            AuthError::Configuration("token expiry overflows the timestamp range".into())
        })?;

        let claims = Claims {
            sub: identity_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            name: username.to_string(),
            role: roles.clone(),
            iat: now,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.key.encoding,
        )
        .map_err(|e| AuthError::Configuration(format!("token signing failed: {e}")))?;

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Why a bearer token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidToken {
    #[error("token has expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token issuer does not match")]
    WrongIssuer,
    #[error("token audience does not match")]
    WrongAudience,
    #[error("token is malformed")]
    Malformed,
}

/// Validates bearer tokens against the shared signing key.
#[derive(Clone)]
pub struct TokenValidator {
    key: Arc<SigningKey>,
    validation: Validation,
}

impl TokenValidator {
    /// Issuer and audience are only enforced when both the `Validate*` flag
    /// is on and a value is configured.
    pub fn new(key: Arc<SigningKey>, config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.clock_skew_seconds;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if config.validate_issuer {
            if let Some(issuer) = &config.issuer {
                validation.set_issuer(&[issuer]);
            }
        }
        if config.validate_audience {
            if let Some(audience) = &config.audience {
                validation.set_audience(&[audience]);
                validation.validate_aud = true;
            }
        }

        Self { key, validation }
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, InvalidToken> {
        jsonwebtoken::decode::<Claims>(token, &self.key.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| classify(&e))
    }
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("leeway", &self.validation.leeway)
            .field("validate_aud", &self.validation.validate_aud)
            .finish_non_exhaustive()
    }
}

fn classify(err: &jsonwebtoken::errors::Error) -> InvalidToken {
    match err.kind() {
        ErrorKind::ExpiredSignature => InvalidToken::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => InvalidToken::BadSignature,
        ErrorKind::InvalidIssuer => InvalidToken::WrongIssuer,
        ErrorKind::InvalidAudience => InvalidToken::WrongAudience,
        ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => InvalidToken::WrongIssuer,
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => InvalidToken::WrongAudience,
        _ => InvalidToken::Malformed,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::auth::claims::roles;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: Some("s3cret".into()),
            ..JwtConfig::default()
        }
    }

    fn key() -> Arc<SigningKey> {
        Arc::new(SigningKey::from_config(&jwt_config()).unwrap())
    }

    fn payload(token: &str) -> serde_json::Value {
        let segment = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn issue_and_validate_access_token() {
        let key = key();
        let issuer = TokenIssuer::access(Arc::clone(&key), &jwt_config()).unwrap();
        let validator = TokenValidator::new(key, &jwt_config());

        let issued = issuer
            .issue("u1", "alice", &RoleSet::single(roles::ADMIN))
            .unwrap();
        let claims = validator.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.role, RoleSet::single(roles::ADMIN));
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp, issued.expires_at);
    }

    #[test]
    fn payload_uses_registered_claim_names() {
        let issuer = TokenIssuer::access(key(), &jwt_config()).unwrap();
        let issued = issuer
            .issue("u1", "alice", &RoleSet::single(roles::ADMIN))
            .unwrap();

        assert_eq!(issued.token.split('.').count(), 3);
        let body = payload(&issued.token);
        assert_eq!(body["sub"], "u1");
        assert_eq!(body["role"], "Admin");
        assert_eq!(body["name"], "alice");
        assert!(body["jti"].is_string());

        let iat = body["iat"].as_i64().unwrap();
        let exp = body["exp"].as_i64().unwrap();
        assert_eq!(exp - iat, 15 * 60);
        assert!((iat - unix_timestamp()).abs() <= 5);
    }

    #[test]
    fn header_is_hs256_jwt() {
        let issuer = TokenIssuer::access(key(), &jwt_config()).unwrap();
        let issued = issuer.issue("u1", "alice", &RoleSet::single("User")).unwrap();

        let header = jsonwebtoken::decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn standard_issuer_uses_expire_minutes() {
        let issuer = TokenIssuer::standard(key(), &jwt_config()).unwrap();
        assert_eq!(issuer.lifetime_secs(), 1440 * 60);

        let issued = issuer.issue("u1", "alice", &RoleSet::single("User")).unwrap();
        assert_eq!(issued.expires_at - issued.issued_at, 1440 * 60);
    }

    #[test]
    fn multiple_roles_round_trip() {
        let key = key();
        let issuer = TokenIssuer::access(Arc::clone(&key), &jwt_config()).unwrap();
        let validator = TokenValidator::new(key, &jwt_config());
        let roles: RoleSet = ["User", "Admin"].into_iter().collect();

        let issued = issuer.issue("u1", "alice", &roles).unwrap();
        assert_eq!(payload(&issued.token)["role"], serde_json::json!(["Admin", "User"]));

        let claims = validator.validate(&issued.token).unwrap();
        assert_eq!(claims.role, roles);
    }

    #[test]
    fn empty_role_set_is_a_configuration_error() {
        let issuer = TokenIssuer::access(key(), &jwt_config()).unwrap();
        let err = issuer.issue("u1", "alice", &RoleSet::new()).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn repeated_issues_differ_only_in_jti() {
        let key = key();
        let issuer = TokenIssuer::access(Arc::clone(&key), &jwt_config()).unwrap();
        let validator = TokenValidator::new(key, &jwt_config());
        let roles = RoleSet::single("User");
        let now = unix_timestamp();

        let first = issuer.issue_at(now, "u1", "alice", &roles).unwrap();
        let second = issuer.issue_at(now, "u1", "alice", &roles).unwrap();
        assert_ne!(first.jti, second.jti);
        assert_ne!(first.token, second.token);

        let mut a = validator.validate(&first.token).unwrap();
        let mut b = validator.validate(&second.token).unwrap();
        assert_ne!(a.jti, b.jti);
        a.jti.clear();
        b.jti.clear();
        assert_eq!(a, b);
    }

    #[test]
    fn expired_token_is_rejected() {
        let key = key();
        let issuer = TokenIssuer::access(Arc::clone(&key), &jwt_config()).unwrap();
        let validator = TokenValidator::new(key, &jwt_config());

        let stale = issuer
            .issue_at(unix_timestamp() - 3600, "u1", "alice", &RoleSet::single("User"))
            .unwrap();
        assert_eq!(validator.validate(&stale.token), Err(InvalidToken::Expired));
    }

    #[test]
    fn token_inside_its_lifetime_is_accepted() {
        let key = key();
        let issuer = TokenIssuer::access(Arc::clone(&key), &jwt_config()).unwrap();
        let validator = TokenValidator::new(key, &jwt_config());

        // Issued 14 minutes ago with a 15 minute lifetime.
        let recent = issuer
            .issue_at(unix_timestamp() - 14 * 60, "u1", "alice", &RoleSet::single("User"))
            .unwrap();
        assert!(validator.validate(&recent.token).is_ok());
    }

    #[test]
    fn clock_skew_extends_acceptance() {
        let key = key();
        let mut config = jwt_config();
        config.clock_skew_seconds = 600;
        let issuer = TokenIssuer::access(Arc::clone(&key), &config).unwrap();
        let validator = TokenValidator::new(key, &config);

        // Expired five minutes ago, inside the ten minute skew.
        let token = issuer
            .issue_at(unix_timestamp() - 20 * 60, "u1", "alice", &RoleSet::single("User"))
            .unwrap();
        assert!(validator.validate(&token.token).is_ok());
    }

    #[test]
    fn token_is_valid_through_its_exp_second() {
        let key = key();
        let issuer = TokenIssuer::access(Arc::clone(&key), &jwt_config()).unwrap();
        let validator = TokenValidator::new(key, &jwt_config());
        let roles = RoleSet::single("User");

        // Retry when the clock ticks between issuing and validating.
        loop {
            let now = unix_timestamp();
            let token = issuer
                .issue_at(now - issuer.lifetime_secs(), "u1", "alice", &roles)
                .unwrap();
            assert_eq!(token.expires_at, now);
            let result = validator.validate(&token.token);
            if unix_timestamp() == now {
                assert!(result.is_ok(), "exp == now must be accepted: {result:?}");
                break;
            }
        }

        let now = unix_timestamp();
        let lapsed = issuer
            .issue_at(now - issuer.lifetime_secs() - 1, "u1", "alice", &roles)
            .unwrap();
        assert_eq!(lapsed.expires_at, now - 1);
        assert_eq!(validator.validate(&lapsed.token), Err(InvalidToken::Expired));
    }

    #[test]
    fn overflowing_lifetime_is_a_configuration_error() {
        let result = TokenIssuer::new(key(), None, None, i64::MAX / 2);
        assert!(matches!(result, Err(AuthError::Configuration(_))));

        let mut config = jwt_config();
        config.access_token_expiry_minutes = i64::MAX;
        assert!(matches!(
            TokenIssuer::access(key(), &config),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn overflowing_expiry_is_a_configuration_error() {
        let issuer = TokenIssuer::access(key(), &jwt_config()).unwrap();
        let err = issuer
            .issue_at(i64::MAX - 60, "u1", "alice", &RoleSet::single("User"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let issuer = TokenIssuer::access(key(), &jwt_config()).unwrap();
        let other = Arc::new(SigningKey::from_secret(b"different-secret").unwrap());
        let validator = TokenValidator::new(other, &jwt_config());

        let issued = issuer.issue("u1", "alice", &RoleSet::single("User")).unwrap();
        assert_eq!(
            validator.validate(&issued.token),
            Err(InvalidToken::BadSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let validator = TokenValidator::new(key(), &jwt_config());
        assert_eq!(
            validator.validate("not-a-valid-token"),
            Err(InvalidToken::Malformed)
        );
    }

    #[test]
    fn issuer_and_audience_are_enforced_when_configured() {
        let key = key();
        let mut config = jwt_config();
        config.issuer = Some("authgate".into());
        config.audience = Some("authgate-clients".into());
        let validator = TokenValidator::new(Arc::clone(&key), &config);

        let good = TokenIssuer::access(Arc::clone(&key), &config)
            .unwrap()
            .issue("u1", "alice", &RoleSet::single("User"))
            .unwrap();
        let claims = validator.validate(&good.token).unwrap();
        assert_eq!(claims.iss.as_deref(), Some("authgate"));
        assert_eq!(claims.aud.as_deref(), Some("authgate-clients"));

        let foreign_issuer = TokenIssuer::new(
            Arc::clone(&key),
            Some("elsewhere".into()),
            config.audience.clone(),
            15,
        )
        .unwrap()
        .issue("u1", "alice", &RoleSet::single("User"))
        .unwrap();
        assert_eq!(
            validator.validate(&foreign_issuer.token),
            Err(InvalidToken::WrongIssuer)
        );

        let foreign_audience = TokenIssuer::new(
            Arc::clone(&key),
            config.issuer.clone(),
            Some("other-app".into()),
            15,
        )
        .unwrap()
        .issue("u1", "alice", &RoleSet::single("User"))
        .unwrap();
        assert_eq!(
            validator.validate(&foreign_audience.token),
            Err(InvalidToken::WrongAudience)
        );
    }

    #[test]
    fn issuer_checks_can_be_disabled() {
        let key = key();
        let mut config = jwt_config();
        config.issuer = Some("authgate".into());
        config.validate_issuer = false;
        let validator = TokenValidator::new(Arc::clone(&key), &config);

        let token = TokenIssuer::new(Arc::clone(&key), Some("elsewhere".into()), None, 15)
            .unwrap()
            .issue("u1", "alice", &RoleSet::single("User"))
            .unwrap();
        assert!(validator.validate(&token.token).is_ok());
    }

    #[test]
    fn unconfigured_issuer_and_audience_are_permissive() {
        let key = key();
        let validator = TokenValidator::new(Arc::clone(&key), &jwt_config());

        let token = TokenIssuer::new(
            Arc::clone(&key),
            Some("anyone".into()),
            Some("anything".into()),
            15,
        )
        .unwrap()
        .issue("u1", "alice", &RoleSet::single("User"))
        .unwrap();
        assert!(validator.validate(&token.token).is_ok());
    }

    #[test]
    fn missing_secret_fails_fast() {
        let err = SigningKey::from_config(&JwtConfig::default()).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
        assert!(SigningKey::from_secret(b"").is_err());
    }

    #[test]
    fn signing_key_debug_is_redacted() {
        assert_eq!(format!("{:?}", key()), "SigningKey(<redacted>)");
    }
}
