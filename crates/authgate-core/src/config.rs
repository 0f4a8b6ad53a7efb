//! Configuration resolution for authgate.
//!
//! Implements layered config resolution:
//! 1. Built-in defaults
//! 2. Settings file (`--config <path>`, else ~/.config/authgate/settings.json)
//! 3. Environment variables (`AUTHGATE_*`)
//! 4. CLI arguments (highest priority, applied by the binary)
//!
//! Settings files use the PascalCase section/key names of the original
//! appsettings layout, e.g. `{"Jwt": {"Secret": "...", "ExpireMinutes": 1440}}`.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest bcrypt cost the hashing backend accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
/// Highest bcrypt cost the hashing backend accepts.
pub const MAX_BCRYPT_COST: u32 = 31;
/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_LIFETIME_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Complete authgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
}

/// HTTP listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// The configured database path, or `~/.authgate/authgate.db`.
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".authgate").join("authgate.db"))
            .ok_or_else(|| Error::Config("Cannot determine home directory".into()))
    }
}

/// Token signing and validation settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct JwtConfig {
    /// HMAC secret. Never serialized back out.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Lifetime of tokens from the generic issuer (account login).
    pub expire_minutes: i64,
    /// Lifetime of access tokens issued at `/api/auth/login`.
    pub access_token_expiry_minutes: i64,
    pub validate_issuer: bool,
    pub validate_audience: bool,
    pub clock_skew_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: None,
            audience: None,
            expire_minutes: 1440,
            access_token_expiry_minutes: 15,
            validate_issuer: true,
            validate_audience: true,
            clock_skew_seconds: 0,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expire_minutes", &self.expire_minutes)
            .field(
                "access_token_expiry_minutes",
                &self.access_token_expiry_minutes,
            )
            .field("validate_issuer", &self.validate_issuer)
            .field("validate_audience", &self.validate_audience)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .finish()
    }
}

impl JwtConfig {
    /// The signing secret, or a configuration error when it is unset or blank.
    pub fn secret(&self) -> Result<&str> {
        match self.secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(Error::Config("Jwt.Secret is not configured".into())),
        }
    }
}

/// Password hashing and complexity policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PasswordConfig {
    /// bcrypt work factor.
    pub cost: u32,
    /// Pre-hash passwords with SHA-384 before bcrypt.
    pub enhanced_entropy: bool,
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            cost: 11,
            enhanced_entropy: true,
            required_length: 8,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

/// Failed-login lockout policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LockoutConfig {
    pub enabled: bool,
    pub max_failed_attempts: u32,
    pub duration_seconds: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            duration_seconds: 300,
        }
    }
}

impl Config {
    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.jwt.secret()?;
        let lifetimes = [
            ("Jwt.ExpireMinutes", self.jwt.expire_minutes),
            (
                "Jwt.AccessTokenExpiryMinutes",
                self.jwt.access_token_expiry_minutes,
            ),
        ];
        for (key, minutes) in lifetimes {
            if minutes <= 0 {
                return Err(Error::Config(format!("{key} must be positive")));
            }
            if minutes > MAX_TOKEN_LIFETIME_MINUTES {
                return Err(Error::Config(format!(
                    "{key} must not exceed {MAX_TOKEN_LIFETIME_MINUTES}"
                )));
            }
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.password.cost) {
            return Err(Error::Config(format!(
                "Password.Cost must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            )));
        }
        if self.lockout.enabled
            && (self.lockout.max_failed_attempts == 0 || self.lockout.duration_seconds <= 0)
        {
            return Err(Error::Config(
                "Lockout.MaxFailedAttempts and Lockout.DurationSeconds must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration with layered resolution.
///
/// An explicitly given `path` must exist; the global settings file is used
/// only when present.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => match global_config_path() {
            Some(global) if global.exists() => load_config_file(&global)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global settings file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("authgate").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `AUTHGATE_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("AUTHGATE_JWT_SECRET") {
        config.jwt.secret = Some(val);
    }
    if let Some(val) = lookup("AUTHGATE_JWT_ISSUER") {
        config.jwt.issuer = Some(val);
    }
    if let Some(val) = lookup("AUTHGATE_JWT_AUDIENCE") {
        config.jwt.audience = Some(val);
    }
    if let Some(val) = lookup("AUTHGATE_JWT_EXPIRE_MINUTES") {
        config.jwt.expire_minutes = parse_env("AUTHGATE_JWT_EXPIRE_MINUTES", &val)?;
    }
    if let Some(val) = lookup("AUTHGATE_JWT_ACCESS_TOKEN_EXPIRY_MINUTES") {
        config.jwt.access_token_expiry_minutes =
            parse_env("AUTHGATE_JWT_ACCESS_TOKEN_EXPIRY_MINUTES", &val)?;
    }
    if let Some(val) = lookup("AUTHGATE_PASSWORD_COST") {
        config.password.cost = parse_env("AUTHGATE_PASSWORD_COST", &val)?;
    }
    if let Some(val) = lookup("AUTHGATE_ADDR") {
        config.server.addr = parse_env("AUTHGATE_ADDR", &val)?;
    }
    if let Some(val) = lookup("AUTHGATE_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {value}")))
}
