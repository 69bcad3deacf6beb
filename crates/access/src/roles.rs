use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Platform role.
///
/// Roles form a total order `Guest < User < Admin`; the derived `Ord` follows
/// declaration order, so comparisons and `max` work directly on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Guest, Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Whether `self` satisfies a requirement of `need`.
    pub fn at_least(self, need: Role) -> bool {
        self >= need
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// `atLeast(have, need)` as a free function.
pub fn at_least(have: Role, need: Role) -> bool {
    have.at_least(need)
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A role requirement on a catalog entry.
///
/// Unrecognized strings are kept rather than rejected so a catalog document
/// still loads; an unrecognized requirement is never satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RequiredRole {
    Known(Role),
    Unrecognized(String),
}

impl RequiredRole {
    pub fn is_met_by(&self, have: Role) -> bool {
        match self {
            RequiredRole::Known(need) => have.at_least(*need),
            RequiredRole::Unrecognized(_) => false,
        }
    }
}

impl From<Role> for RequiredRole {
    fn from(value: Role) -> Self {
        RequiredRole::Known(value)
    }
}

impl From<&str> for RequiredRole {
    fn from(value: &str) -> Self {
        match Role::from_str(value) {
            Ok(role) => RequiredRole::Known(role),
            Err(_) => RequiredRole::Unrecognized(value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for RequiredRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RequiredRole::from(raw.as_str()))
    }
}

/// Deserialize an optional role, mapping unknown role strings to `None`.
///
/// Used for rule grants: an unknown role must never escalate, so it is treated
/// like a missing role.
pub(crate) fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let role = match raw {
        serde_json::Value::Null => None,
        serde_json::Value::String(value) => match Role::from_str(&value) {
            Ok(role) => Some(role),
            Err(err) => {
                tracing::warn!("{err}; ignoring role in granted access");
                None
            }
        },
        other => {
            tracing::warn!("malformed role {other}; ignoring role in granted access");
            None
        }
    };
    Ok(role)
}
