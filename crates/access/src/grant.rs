//! Access grants and the merge that accumulates them.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use portal_core::{ApplicationId, RuleId};

use crate::permissions::{FunctionRef, Permission};
use crate::roles::{Role, lenient_role};

/// What a single rule (or the default) grants.
///
/// Every field tolerates being missing or malformed: a missing or invalid set
/// reads as empty and a missing or unknown role reads as `None`, which merges
/// as "keep the current role". Malformed input can therefore only ever grant
/// less, never more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantedAccess {
    #[serde(default, deserialize_with = "lenient_set")]
    pub applications: BTreeSet<ApplicationId>,

    #[serde(default, deserialize_with = "lenient_set")]
    pub functions: BTreeSet<FunctionRef>,

    #[serde(default, deserialize_with = "lenient_set")]
    pub permissions: BTreeSet<Permission>,

    #[serde(default, deserialize_with = "lenient_role", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl GrantedAccess {
    pub fn new(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn with_applications<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ApplicationId>,
    {
        self.applications.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_functions<'a, I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.functions.extend(ids.into_iter().map(FunctionRef::new));
        self
    }

    pub fn with_permissions<'a, I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.permissions.extend(names.into_iter().map(Permission::new));
        self
    }
}

fn lenient_set<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Ord,
{
    let raw = Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(BTreeSet::new());
    }
    match serde_json::from_value::<Vec<T>>(raw) {
        Ok(values) => Ok(values.into_iter().collect()),
        Err(err) => {
            tracing::warn!("malformed granted access list ({err}); treating as empty");
            Ok(BTreeSet::new())
        }
    }
}

/// Accumulated result of applying every matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub applications: BTreeSet<ApplicationId>,
    pub functions: BTreeSet<FunctionRef>,
    pub permissions: BTreeSet<Permission>,
    pub role: Role,
    /// Ids of the rules that matched, in evaluation order.
    pub applied_rules: Vec<RuleId>,
}

impl AccessGrant {
    /// Starting point of an evaluation: the default access, no rules applied.
    ///
    /// A default without a role starts at [`Role::Guest`].
    pub fn from_default(default_access: &GrantedAccess) -> Self {
        Self {
            applications: default_access.applications.clone(),
            functions: default_access.functions.clone(),
            permissions: default_access.permissions.clone(),
            role: default_access.role.unwrap_or_default(),
            applied_rules: Vec::new(),
        }
    }

    /// Merge `incoming` into a new grant.
    ///
    /// Sets are unioned; the role is the maximum of both, so merging can only
    /// escalate. The applied-rule trace is carried over unchanged.
    pub fn merge(&self, incoming: &GrantedAccess) -> AccessGrant {
        AccessGrant {
            applications: self.applications.union(&incoming.applications).cloned().collect(),
            functions: self.functions.union(&incoming.functions).cloned().collect(),
            permissions: self.permissions.union(&incoming.permissions).cloned().collect(),
            role: incoming.role.map_or(self.role, |role| self.role.max(role)),
            applied_rules: self.applied_rules.clone(),
        }
    }

    /// Record that a rule contributed to this grant.
    pub fn applied(mut self, rule_id: RuleId) -> Self {
        self.applied_rules.push(rule_id);
        self
    }

    pub fn has_access(&self) -> bool {
        !self.applications.is_empty()
    }
}

/// `merge(existing, incoming)` as a free function.
pub fn merge(existing: &AccessGrant, incoming: &GrantedAccess) -> AccessGrant {
    existing.merge(incoming)
}
