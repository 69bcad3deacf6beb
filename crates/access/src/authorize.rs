//! Permission and role checks on a projected user.
//!
//! These are the only place full access is realized: an active admin passes
//! every permission check. `Permission::All` in a non-admin's set is just a
//! permission named `"*"`.

use serde::Serialize;
use thiserror::Error;

use portal_core::SubjectId;

use crate::permissions::Permission;
use crate::roles::{RequiredRole, Role};
use crate::user::User;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user is not active")]
    Inactive,

    #[error("forbidden: requires role '{need}', user has '{have}'")]
    InsufficientRole { need: String, have: Role },

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Whether the user satisfies a role requirement. Inactive users never do.
pub fn has_role(user: &User, required: &RequiredRole) -> bool {
    user.is_active && required.is_met_by(user.role)
}

/// Whether the user holds a permission.
///
/// - inactive ⇒ no
/// - admin ⇒ yes, regardless of the permission set
/// - otherwise exact membership
pub fn has_permission(user: &User, required: &Permission) -> bool {
    if !user.is_active {
        return false;
    }
    user.role.is_admin() || user.permissions.contains(required)
}

/// Authorize a route/command requiring `required`.
///
/// - No IO
/// - No panics
pub fn authorize(user: &User, required: &Permission) -> Result<(), AuthzError> {
    if !user.is_active {
        return Err(AuthzError::Inactive);
    }
    if has_permission(user, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Authorize a route requiring at least `required`.
pub fn authorize_role(user: &User, required: &RequiredRole) -> Result<(), AuthzError> {
    if !user.is_active {
        return Err(AuthzError::Inactive);
    }
    if has_role(user, required) {
        return Ok(());
    }
    let need = match required {
        RequiredRole::Known(role) => role.as_str().to_string(),
        RequiredRole::Unrecognized(raw) => raw.clone(),
    };
    Err(AuthzError::InsufficientRole {
        need,
        have: user.role,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub user: UserState,
    pub denial_reason: Option<DenialReason>,
}

/// Snapshot of the user being checked.
#[derive(Debug, Clone, Serialize)]
pub struct UserState {
    pub id: Option<SubjectId>,
    pub role: Role,
    pub is_active: bool,
    pub permissions: Vec<String>,
    pub applied_rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Inactive,
    MissingPermission,
}

/// Explain why `authorize(user, required)` allows or denies.
pub fn explain_authorization(user: &User, required: &Permission) -> AuthorizationExplanation {
    let required_str = required.as_str().to_string();
    let state = UserState {
        id: user.id.clone(),
        role: user.role,
        is_active: user.is_active,
        permissions: user.permissions.iter().map(|p| p.as_str().to_string()).collect(),
        applied_rules: user
            .directory
            .applied_rules
            .iter()
            .map(|r| r.as_str().to_string())
            .collect(),
    };

    if !user.is_active {
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: false,
            reason: "User is not active; every permission check fails".to_string(),
            user: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::Inactive,
                message: "Directory status is not one of the configured active statuses".to_string(),
                suggestions: vec!["Verify or activate the account in the identity directory".to_string()],
            }),
        };
    }

    if user.role.is_admin() {
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: true,
            reason: "User has role 'admin', which bypasses permission checks".to_string(),
            user: state,
            denial_reason: None,
        };
    }

    if user.permissions.contains(required) {
        return AuthorizationExplanation {
            reason: format!("User has explicit permission '{required_str}'"),
            required_permission: required_str,
            granted: true,
            user: state,
            denial_reason: None,
        };
    }

    let mut suggestions = vec![format!(
        "Add a rule granting '{required_str}' that matches this identity"
    )];
    if user.permissions.contains(&Permission::All) {
        suggestions.insert(
            0,
            "The user holds '*', which only grants full access together with role 'admin'".to_string(),
        );
    }

    AuthorizationExplanation {
        reason: format!(
            "User does not have permission '{required_str}'. Current permissions: {:?}",
            state.permissions
        ),
        required_permission: required_str.clone(),
        granted: false,
        user: state,
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{required_str}'"),
            suggestions,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{AccessGrant, GrantedAccess};
    use crate::identity::IdentityRecord;
    use crate::user::project;

    fn user(role: Role, permissions: &[&str], status: &str) -> User {
        let grant = AccessGrant::from_default(
            &GrantedAccess::new(role).with_permissions(permissions.iter().copied()),
        );
        project(&IdentityRecord::new("u-1").with_status(status), &grant)
    }

    #[test]
    fn admin_passes_every_permission_check() {
        let admin = user(Role::Admin, &[], "VERIFIED");
        assert!(authorize(&admin, &Permission::new("csrd.reporting")).is_ok());
    }

    #[test]
    fn star_does_not_unlock_anything_for_non_admin() {
        let holder = user(Role::User, &["*"], "VERIFIED");
        assert_eq!(
            authorize(&holder, &Permission::new("csrd.access")),
            Err(AuthzError::Forbidden("csrd.access".to_string()))
        );
        assert!(has_permission(&holder, &Permission::All));

        let explanation = explain_authorization(&holder, &Permission::new("csrd.access"));
        assert!(!explanation.granted);
        let denial = explanation.denial_reason.unwrap();
        assert_eq!(denial.kind, DenialKind::MissingPermission);
        assert!(denial.suggestions[0].contains("'*'"));
    }

    #[test]
    fn inactive_user_fails_everything() {
        let pending = user(Role::Admin, &["csrd.access"], "PENDING");
        assert_eq!(authorize(&pending, &Permission::new("csrd.access")), Err(AuthzError::Inactive));
        assert!(!has_role(&pending, &RequiredRole::Known(Role::Guest)));
        assert_eq!(
            explain_authorization(&pending, &Permission::new("x")).denial_reason.map(|d| d.kind),
            Some(DenialKind::Inactive)
        );
    }

    #[test]
    fn role_requirement_reports_levels() {
        let guest = user(Role::Guest, &[], "ACTIVE");
        let err = authorize_role(&guest, &RequiredRole::Known(Role::User)).unwrap_err();
        assert_eq!(
            err,
            AuthzError::InsufficientRole {
                need: "user".to_string(),
                have: Role::Guest
            }
        );
        assert!(authorize_role(&guest, &RequiredRole::Known(Role::Guest)).is_ok());
        assert!(authorize_role(&guest, &RequiredRole::from("owner")).is_err());
    }

    #[test]
    fn explicit_permission_is_explained() {
        let member = user(Role::User, &["csrd.access"], "VERIFIED");
        let explanation = explain_authorization(&member, &Permission::new("csrd.access"));
        assert!(explanation.granted);
        assert!(explanation.reason.contains("explicit permission"));
    }
}
