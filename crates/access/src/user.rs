//! Internal user profile projected from an identity record and its grant.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use portal_core::{ApplicationId, RuleId, SubjectId, TenantId};

use crate::grant::AccessGrant;
use crate::identity::IdentityRecord;
use crate::permissions::{FunctionRef, Permission};
use crate::roles::Role;

/// Tenant assigned when the caller does not supply one.
pub const DEFAULT_TENANT: &str = "konstruktiv";

/// Directory statuses that count as active by default.
pub const DEFAULT_ACTIVE_STATUSES: [&str; 2] = ["VERIFIED", "ACTIVE"];

/// Projection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectorConfig {
    /// Status tags (case-insensitive) that make a user active.
    pub active_statuses: BTreeSet<String>,
    pub tenant_id: TenantId,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            active_statuses: DEFAULT_ACTIVE_STATUSES.iter().map(|s| s.to_string()).collect(),
            tenant_id: TenantId::new(DEFAULT_TENANT),
        }
    }
}

impl ProjectorConfig {
    pub fn with_tenant(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    pub fn is_active_status(&self, status: Option<&str>) -> bool {
        status.is_some_and(|status| {
            self.active_statuses
                .iter()
                .any(|active| active.eq_ignore_ascii_case(status.trim()))
        })
    }
}

/// Raw directory data kept on the user for audit/debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryTrace {
    pub sub: Option<SubjectId>,
    pub groups: BTreeSet<String>,
    pub roles: BTreeSet<String>,
    pub subscription: Option<String>,
    pub applied_rules: Vec<RuleId>,
}

/// Internal user, created per request. Not persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<SubjectId>,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub company_id: TenantId,
    pub permissions: BTreeSet<Permission>,
    pub is_active: bool,
    pub accessible_apps: BTreeSet<ApplicationId>,
    pub accessible_functions: BTreeSet<FunctionRef>,
    pub directory: DirectoryTrace,
}

/// Derives internal users from identity records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityProjector {
    config: ProjectorConfig,
}

impl IdentityProjector {
    pub fn new(config: ProjectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Build the user profile.
    ///
    /// The grant's permissions are copied verbatim; `"*"` gets no special
    /// treatment here.
    pub fn project(&self, identity: &IdentityRecord, grant: &AccessGrant) -> User {
        User {
            id: identity.sub.clone(),
            name: display_name(identity),
            email: identity.email().map(str::to_string),
            role: grant.role,
            company_id: self.config.tenant_id.clone(),
            permissions: grant.permissions.clone(),
            is_active: self.config.is_active_status(identity.status()),
            accessible_apps: grant.applications.clone(),
            accessible_functions: grant.functions.clone(),
            directory: DirectoryTrace {
                sub: identity.sub.clone(),
                groups: identity.groups.clone(),
                roles: identity.roles.clone(),
                subscription: identity.subscription().map(str::to_string),
                applied_rules: grant.applied_rules.clone(),
            },
        }
    }
}

/// `project(identity, grant)` with the default configuration.
pub fn project(identity: &IdentityRecord, grant: &AccessGrant) -> User {
    IdentityProjector::default().project(identity, grant)
}

// "Given Family" when both parts exist, else the email, else the subject id.
fn display_name(identity: &IdentityRecord) -> String {
    let given = identity.given_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let family = identity.family_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match (given, family) {
        (Some(given), Some(family)) => format!("{given} {family}"),
        _ => identity
            .email()
            .map(str::to_string)
            .or_else(|| identity.sub.as_ref().map(|s| s.to_string()))
            .unwrap_or_default(),
    }
}
