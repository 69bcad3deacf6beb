//! Application catalog and the per-user catalog filter.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use portal_core::{
    ApplicationId, DomainError, DomainResult, Entity, FunctionId, SubjectId, TenantId,
    first_duplicate_id,
};

use crate::authorize::{has_permission, has_role};
use crate::permissions::Permission;
use crate::roles::{RequiredRole, Role};
use crate::user::User;

fn default_required_role() -> Option<RequiredRole> {
    Some(RequiredRole::Known(Role::User))
}

fn enabled_by_default() -> bool {
    true
}

fn clickable_by_default() -> bool {
    true
}

/// Access requirements shared by applications and functions.
///
/// An absent `requiredRole` defaults to `user`; an explicit `null` means no
/// role requirement. Empty allow-lists count as not configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequirements {
    #[serde(default = "default_required_role")]
    pub required_role: Option<RequiredRole>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_permissions: Vec<Permission>,

    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,

    #[serde(default, alias = "availableForCompanies", skip_serializing_if = "BTreeSet::is_empty")]
    pub available_for_tenants: BTreeSet<TenantId>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub available_for_users: BTreeSet<SubjectId>,
}

impl Default for AccessRequirements {
    fn default() -> Self {
        Self {
            required_role: default_required_role(),
            required_permissions: Vec::new(),
            is_enabled: true,
            available_for_tenants: BTreeSet::new(),
            available_for_users: BTreeSet::new(),
        }
    }
}

impl AccessRequirements {
    pub fn open() -> Self {
        Self {
            required_role: None,
            ..Default::default()
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.required_role = Some(RequiredRole::Known(role));
        self
    }

    pub fn permissions<'a, I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.required_permissions = names.into_iter().map(Permission::new).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    /// First check this user fails, if any.
    pub fn denial(&self, user: &User) -> Option<Denial> {
        if !self.is_enabled {
            return Some(Denial::Disabled);
        }
        if let Some(required) = &self.required_role {
            if !has_role(user, required) {
                return Some(Denial::Role);
            }
        }
        if let Some(missing) = self
            .required_permissions
            .iter()
            .find(|permission| !has_permission(user, permission))
        {
            return Some(Denial::Permission(missing.clone()));
        }
        if !self.available_for_tenants.is_empty()
            && !self.available_for_tenants.contains(&user.company_id)
        {
            return Some(Denial::Tenant);
        }
        if !self.available_for_users.is_empty()
            && !user
                .id
                .as_ref()
                .is_some_and(|id| self.available_for_users.contains(id))
        {
            return Some(Denial::User);
        }
        None
    }
}

/// Why a catalog entry is hidden from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Disabled,
    Role,
    Permission(Permission),
    Tenant,
    User,
}

impl core::fmt::Display for Denial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Denial::Disabled => f.write_str("disabled"),
            Denial::Role => f.write_str("role requirement not met"),
            Denial::Permission(p) => write!(f, "missing permission '{p}'"),
            Denial::Tenant => f.write_str("tenant not in allow-list"),
            Denial::User => f.write_str("user not in allow-list"),
        }
    }
}

/// A function nested under an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppFunction {
    pub id: FunctionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub access: AccessRequirements,
}

impl AppFunction {
    pub fn new(id: impl Into<FunctionId>, access: AccessRequirements) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            url: String::new(),
            icon: None,
            access,
        }
    }
}

impl Entity for AppFunction {
    type Id = FunctionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A portal application with its functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
    #[serde(default = "clickable_by_default")]
    pub is_clickable: bool,
    #[serde(flatten)]
    pub access: AccessRequirements,
    #[serde(default)]
    pub functions: Vec<AppFunction>,
}

impl Application {
    pub fn new(id: impl Into<ApplicationId>, access: AccessRequirements) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            url: String::new(),
            icon: None,
            color: None,
            gradient: None,
            is_clickable: true,
            access,
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: AppFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn function(&self, id: &FunctionId) -> Option<&AppFunction> {
        self.functions.iter().find(|f| &f.id == id)
    }
}

impl Entity for Application {
    type Id = ApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Load-time checks: application ids are unique, and so are function ids
/// within one application.
pub fn validate(catalog: &[Application]) -> DomainResult<()> {
    if let Some(id) = first_duplicate_id(catalog) {
        return Err(DomainError::duplicate(format!("application id '{id}'")));
    }
    for app in catalog {
        if let Some(id) = first_duplicate_id(&app.functions) {
            return Err(DomainError::duplicate(format!("function id '{}.{id}'", app.id)));
        }
    }
    Ok(())
}

/// Prune `catalog` to what `user` may see.
///
/// Each application and each of its functions must pass: enabled, role,
/// permissions (bypassed for an active admin), tenant and user allow-lists.
/// Returns a filtered copy; the input is left untouched.
pub fn filter(catalog: &[Application], user: &User) -> Vec<Application> {
    catalog
        .iter()
        .filter_map(|app| {
            if let Some(denial) = app.access.denial(user) {
                tracing::debug!(application = %app.id, %denial, "application hidden");
                return None;
            }

            let functions = app
                .functions
                .iter()
                .filter(|function| match function.access.denial(user) {
                    Some(denial) => {
                        tracing::debug!(
                            application = %app.id,
                            function = %function.id,
                            %denial,
                            "function hidden"
                        );
                        false
                    }
                    None => true,
                })
                .cloned()
                .collect();

            Some(Application {
                functions,
                ..app.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{AccessGrant, GrantedAccess};
    use crate::identity::IdentityRecord;
    use crate::user::project;

    fn user(role: Role, permissions: &[&str]) -> User {
        let grant = AccessGrant::from_default(
            &GrantedAccess::new(role).with_permissions(permissions.iter().copied()),
        );
        project(&IdentityRecord::new("u-1").with_status("VERIFIED"), &grant)
    }

    fn ids(catalog: &[Application]) -> Vec<&str> {
        catalog.iter().map(|a| a.id.as_str()).collect()
    }

    fn benchmark() -> Application {
        Application::new(
            "benchmark",
            AccessRequirements::default().role(Role::User).permissions(["benchmark.access"]),
        )
        .with_function(AppFunction::new(
            "product-benchmark",
            AccessRequirements::default().role(Role::User).permissions(["benchmark.products"]),
        ))
        .with_function(AppFunction::new(
            "competitive-intelligence",
            AccessRequirements::default().role(Role::Admin).permissions(["benchmark.competitive"]),
        ))
    }

    #[test]
    fn disabled_app_is_dropped_for_everyone() {
        let catalog = vec![Application::new("old", AccessRequirements::open().disabled())];
        assert!(filter(&catalog, &user(Role::Admin, &[])).is_empty());
        assert!(filter(&catalog, &user(Role::Guest, &[])).is_empty());
    }

    #[test]
    fn admin_bypasses_permissions_only() {
        let catalog = vec![
            benchmark(),
            Application::new("off", AccessRequirements::default().disabled()),
        ];

        let filtered = filter(&catalog, &user(Role::Admin, &[]));
        assert_eq!(ids(&filtered), vec!["benchmark"]);
        assert_eq!(filtered[0].functions.len(), 2);
    }

    #[test]
    fn functions_are_filtered_recursively() {
        let member = user(Role::User, &["benchmark.access", "benchmark.products", "benchmark.competitive"]);
        let filtered = filter(&[benchmark()], &member);

        let functions: Vec<&str> = filtered[0].functions.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(functions, vec!["product-benchmark"]);
    }

    #[test]
    fn all_required_permissions_must_be_held() {
        let member = user(Role::User, &["benchmark.products"]);
        assert!(filter(&[benchmark()], &member).is_empty());

        let star = user(Role::User, &["*"]);
        assert!(filter(&[benchmark()], &star).is_empty());
    }

    #[test]
    fn allow_lists_check_tenant_and_user() {
        let mut tenant_only = AccessRequirements::open();
        tenant_only.available_for_tenants.insert(TenantId::new("konstruktiv-subsidiary-2"));
        let mut user_only = AccessRequirements::open();
        user_only.available_for_users.insert(SubjectId::new("u-1"));

        let catalog = vec![
            Application::new("tenant-scoped", tenant_only),
            Application::new("user-scoped", user_only),
        ];
        assert_eq!(ids(&filter(&catalog, &user(Role::Admin, &[]))), vec!["user-scoped"]);
    }

    #[test]
    fn unrecognized_role_requirement_fails_closed() {
        let mut access = AccessRequirements::open();
        access.required_role = Some(RequiredRole::from("owner"));
        let catalog = vec![Application::new("mystery", access)];
        assert!(filter(&catalog, &user(Role::Admin, &[])).is_empty());
    }

    #[test]
    fn inactive_user_sees_only_unrestricted_entries() {
        let mut pending = user(Role::Admin, &[]);
        pending.is_active = false;

        let catalog = vec![
            Application::new("open", AccessRequirements::open()),
            Application::new("guest", AccessRequirements::default().role(Role::Guest)),
        ];
        assert_eq!(ids(&filter(&catalog, &pending)), vec!["open"]);
    }

    #[test]
    fn input_catalog_is_not_mutated() {
        let catalog = vec![benchmark()];
        let before = catalog.clone();
        let _ = filter(&catalog, &user(Role::User, &["benchmark.access"]));
        assert_eq!(catalog, before);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        assert!(validate(&[benchmark(), Application::new("csrd", AccessRequirements::open())]).is_ok());

        let twice = validate(&[benchmark(), benchmark()]).unwrap_err();
        assert_eq!(twice, DomainError::Duplicate("application id 'benchmark'".to_string()));

        let nested = benchmark().with_function(AppFunction::new("product-benchmark", AccessRequirements::open()));
        assert_eq!(
            validate(&[nested]),
            Err(DomainError::Duplicate("function id 'benchmark.product-benchmark'".to_string()))
        );
    }

    #[test]
    fn absent_required_role_defaults_to_user() {
        let app: Application = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(app.access.required_role, Some(RequiredRole::Known(Role::User)));
        assert!(app.access.is_enabled);

        let open: Application = serde_json::from_str(r#"{"id": "x", "requiredRole": null}"#).unwrap();
        assert_eq!(open.access.required_role, None);
    }
}
