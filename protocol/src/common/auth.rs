//! Authentication-related common types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role tier of the signed-in principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Semiadmin,
    Basic,
    #[serde(other)]
    Other,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Semiadmin => "semiadmin",
            UserRole::Basic => "basic",
            UserRole::Other => "other",
        }
    }
}

/// Profile of the signed-in user, stored JSON-encoded under the `user` key.
///
/// `username` and `type` are required; any other field the backend sends is
/// kept in `extra` so that writing the profile back does not lose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub role: UserRole,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Claims read from the payload of a session JWT
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Subject
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let raw = r#"{"username":"maria","name":"Maria R.","type":"semiadmin","office":"Lima"}"#;
        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.role, UserRole::Semiadmin);
        assert_eq!(profile.extra.get("office"), Some(&Value::from("Lima")));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["type"], "semiadmin");
        assert_eq!(back["office"], "Lima");
    }

    #[test]
    fn test_profile_requires_type() {
        let raw = r#"{"username":"maria"}"#;
        assert!(serde_json::from_str::<UserProfile>(raw).is_err());
    }

    #[test]
    fn test_unknown_role_maps_to_other() {
        let raw = r#"{"username":"x","type":"auditor"}"#;
        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.role, UserRole::Other);
        assert_eq!(profile.display_name(), "x");
    }
}
