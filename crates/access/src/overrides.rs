//! Administrator overrides for catalog entries.
//!
//! Overrides are keyed by `"<app>"` for applications and `"<app>.<function>"`
//! for functions. Each set field replaces the catalog's value; unset fields
//! leave it alone. `"requiredRole": null` clears the role requirement.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use portal_core::{ApplicationId, FunctionId, SubjectId, TenantId};

use crate::catalog::{AccessRequirements, Application};
use crate::permissions::Permission;
use crate::roles::RequiredRole;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// `None`: keep. `Some(None)`: no role requirement. `Some(Some(r))`: require `r`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub required_role: Option<Option<RequiredRole>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<Permission>>,
    #[serde(default, alias = "availableForCompanies", skip_serializing_if = "Option::is_none")]
    pub available_for_tenants: Option<BTreeSet<TenantId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_for_users: Option<BTreeSet<SubjectId>>,
}

// A key that is present, even as `null`, deserializes to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl CatalogOverride {
    fn apply_to(&self, access: &mut AccessRequirements) {
        if let Some(enabled) = self.enabled {
            access.is_enabled = enabled;
        }
        if let Some(role) = &self.required_role {
            access.required_role = role.clone();
        }
        if let Some(permissions) = &self.required_permissions {
            access.required_permissions = permissions.clone();
        }
        if let Some(tenants) = &self.available_for_tenants {
            access.available_for_tenants = tenants.clone();
        }
        if let Some(users) = &self.available_for_users {
            access.available_for_users = users.clone();
        }
    }
}

/// All overrides, keyed by catalog path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogOverrides(BTreeMap<String, CatalogOverride>);

impl CatalogOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn application_key(app: &ApplicationId) -> String {
        app.as_str().to_string()
    }

    pub fn function_key(app: &ApplicationId, function: &FunctionId) -> String {
        format!("{app}.{function}")
    }

    pub fn set_application(&mut self, app: &ApplicationId, value: CatalogOverride) {
        self.0.insert(Self::application_key(app), value);
    }

    pub fn set_function(&mut self, app: &ApplicationId, function: &FunctionId, value: CatalogOverride) {
        self.0.insert(Self::function_key(app, function), value);
    }

    pub fn for_application(&self, app: &ApplicationId) -> Option<&CatalogOverride> {
        self.0.get(app.as_str())
    }

    pub fn for_function(&self, app: &ApplicationId, function: &FunctionId) -> Option<&CatalogOverride> {
        self.0.get(&Self::function_key(app, function))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Return a copy of `catalog` with `overrides` applied.
pub fn apply_overrides(catalog: &[Application], overrides: &CatalogOverrides) -> Vec<Application> {
    if overrides.is_empty() {
        return catalog.to_vec();
    }

    catalog
        .iter()
        .map(|app| {
            let mut app = app.clone();
            if let Some(value) = overrides.for_application(&app.id) {
                value.apply_to(&mut app.access);
            }
            for function in &mut app.functions {
                if let Some(value) = overrides.for_function(&app.id, &function.id) {
                    value.apply_to(&mut function.access);
                }
            }
            app
        })
        .collect()
}
