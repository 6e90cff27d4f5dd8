//! # Core Types
//!
//! Data structures shared by the token codec, the resolver, the gateway and the HTTP
//! handlers: identity roles, the request-scoped principal and the login DTOs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::ClubError;

/// Prefix that turns a role tag into an authority name
pub const AUTHORITY_PREFIX: &str = "ROLE_";

/// The three identity kinds known to the club backend
///
/// The declaration order is the login resolution priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Player,
    Parent,
}

impl Role {
    /// Roles in resolution priority order (coach > player > parent)
    pub const PRIORITY: [Role; 3] = [Role::Coach, Role::Player, Role::Parent];

    /// Tag embedded in tokens and returned by the login endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coach => "coach",
            Role::Player => "player",
            Role::Parent => "parent",
        }
    }

    /// Authority name granted to principals of this role
    pub fn authority(&self) -> String {
        authority_for(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coach" => Ok(Role::Coach),
            "player" => Ok(Role::Player),
            "parent" => Ok(Role::Parent),
            other => Err(ClubError::validation("role", format!("unknown role '{}'", other))),
        }
    }
}

/// Map a role tag to its namespaced authority
///
/// Tags that already carry the prefix are kept verbatim.
pub fn authority_for(role: &str) -> String {
    if role.starts_with(AUTHORITY_PREFIX) {
        role.to_string()
    } else {
        format!("{}{}", AUTHORITY_PREFIX, role.to_uppercase())
    }
}

/// Authenticated identity bound to a single in-flight request
///
/// Lives in the request extensions and is dropped with the request; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub identity_id: String,
    pub role: String,
    pub authority: String,
}

impl Principal {
    pub fn new<I: Into<String>, R: Into<String>>(identity_id: I, role: R) -> Self {
        let role = role.into();
        Self {
            identity_id: identity_id.into(),
            authority: authority_for(&role),
            role,
        }
    }

    /// Check whether the principal was granted an authority
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authority == authority
    }
}

/// Body of `POST /api/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "identificador")]
    pub identifier: String,
    pub password: String,
}

/// Successful login response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub role: String,
    pub identity_id: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tags_and_authorities() {
        assert_eq!(Role::Coach.as_str(), "coach");
        assert_eq!(Role::Player.authority(), "ROLE_PLAYER");
        assert_eq!("Parent".parse::<Role>().unwrap(), Role::Parent);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_authority_keeps_existing_prefix() {
        assert_eq!(authority_for("ROLE_COACH"), "ROLE_COACH");
        assert_eq!(authority_for("coach"), "ROLE_COACH");
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(Role::PRIORITY, [Role::Coach, Role::Player, Role::Parent]);
    }

    #[test]
    fn test_login_response_omits_missing_team() {
        let response = LoginResponse {
            role: "coach".to_string(),
            identity_id: "C1".to_string(),
            token: "t".to_string(),
            team_id: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["identityId"], "C1");
        assert!(value.get("teamId").is_none());
    }

    #[test]
    fn test_login_request_accepts_legacy_field() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"identificador":"J7","password":"pw"}"#).unwrap();
        assert_eq!(request.identifier, "J7");
    }
}
