//! JWT claims structure for authgate tokens.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Well-known role names.
pub mod roles {
    pub const ADMIN: &str = "Admin";
    pub const USER: &str = "User";
    pub const GUEST: &str = "Guest";
}

/// Ordered set of role names carried by a token.
///
/// Blank names are never stored. On the wire a set with exactly one role is
/// a plain string (`"role": "Admin"`); any other size is an array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// A set holding a single role (empty if `role` is blank).
    pub fn single(role: impl Into<String>) -> Self {
        let mut set = Self::new();
        set.insert(role);
        set
    }

    /// Insert a role, trimming surrounding whitespace. Returns `false` for
    /// blank or already present roles.
    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        let role = role.into();
        let trimmed = role.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.0.insert(trimmed.to_string())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.first() {
            Some(only) if self.0.len() == 1 => serializer.serialize_str(only),
            _ => serializer.collect_seq(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(role) => Self::single(role),
            OneOrMany::Many(roles) => roles.into_iter().collect(),
        })
    }
}

/// JWT claims embedded in issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity ID).
    pub sub: String,
    /// JWT ID (unique per token).
    pub jti: String,
    /// Username.
    pub name: String,
    /// Roles granted to the subject.
    #[serde(default)]
    pub role: RoleSet,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.contains(role)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_roles_are_dropped() {
        let set: RoleSet = ["Admin", "  ", "", " User "].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("Admin"));
        assert!(set.contains("User"));
        assert!(RoleSet::single("   ").is_empty());
    }

    #[test]
    fn single_role_serializes_as_string() {
        let json = serde_json::to_value(RoleSet::single(roles::ADMIN)).unwrap();
        assert_eq!(json, serde_json::json!("Admin"));
    }

    #[test]
    fn multiple_roles_serialize_as_sorted_array() {
        let set: RoleSet = ["User", "Admin"].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!(["Admin", "User"]));
    }

    #[test]
    fn role_claim_accepts_both_shapes() {
        let one: RoleSet = serde_json::from_str("\"Guest\"").unwrap();
        assert_eq!(one, RoleSet::single("Guest"));

        let many: RoleSet = serde_json::from_str("[\"Guest\",\"User\",\"Guest\"]").unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn issuer_and_audience_omitted_when_absent() {
        let claims = Claims {
            sub: "u1".into(),
            jti: "j1".into(),
            name: "alice".into(),
            role: RoleSet::single("User"),
            iat: 1,
            exp: 2,
            iss: None,
            aud: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("iss").is_none());
        assert!(json.get("aud").is_none());
        assert_eq!(json["role"], "User");
        assert!(claims.has_role("User"));
        assert!(!claims.has_role("Admin"));
    }
}
