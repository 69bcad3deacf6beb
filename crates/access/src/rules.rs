use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use portal_core::{DomainError, DomainResult, Entity, RuleId, first_duplicate_id};

use crate::conditions::Conditions;
use crate::grant::GrantedAccess;

/// Declarative condition → grant mapping.
///
/// Rules are immutable once loaded. `priority` orders evaluation (higher
/// first) and the order of the applied-rule trace; it does not make one rule
/// override another, every matching rule is merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    pub id: RuleId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Required on the wire; `{}` is the explicit match-everyone form.
    #[serde(alias = "cidaasConditions")]
    pub conditions: Conditions,

    #[serde(default)]
    pub granted_access: GrantedAccess,

    #[serde(default)]
    pub priority: i64,

    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl AccessRule {
    pub fn new(
        id: impl Into<RuleId>,
        priority: i64,
        conditions: Conditions,
        granted_access: GrantedAccess,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            conditions,
            granted_access,
            priority,
            is_active: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl Entity for AccessRule {
    type Id = RuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Active rules, highest priority first; equal priorities keep input order.
pub fn active_in_priority_order(rules: &[AccessRule]) -> Vec<&AccessRule> {
    let mut active: Vec<&AccessRule> = rules.iter().filter(|r| r.is_active).collect();
    active.sort_by_key(|rule| Reverse(rule.priority));
    active
}

/// An ordered rule collection plus the fallback grant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<AccessRule>,

    #[serde(default)]
    pub default_access: GrantedAccess,
}

impl RuleSet {
    pub fn new(rules: Vec<AccessRule>, default_access: GrantedAccess) -> Self {
        Self {
            rules,
            default_access,
        }
    }

    /// Active rules, highest priority first.
    ///
    /// The sort is stable: rules with equal priority keep their document order.
    pub fn active_in_priority_order(&self) -> Vec<&AccessRule> {
        active_in_priority_order(&self.rules)
    }

    pub fn get(&self, id: &RuleId) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }

    /// Load-time checks: rule ids must be non-blank and unique.
    ///
    /// Active rules without conditions are accepted but logged, since they
    /// match every identity.
    pub fn validate(&self) -> DomainResult<()> {
        if self.rules.iter().any(|rule| rule.id.is_blank()) {
            return Err(DomainError::invalid_id("rule id must not be blank"));
        }
        if let Some(id) = first_duplicate_id(&self.rules) {
            return Err(DomainError::duplicate(format!("rule id '{id}'")));
        }
        for rule in self.rules.iter().filter(|rule| rule.is_active && rule.conditions.is_vacuous()) {
            tracing::warn!(rule_id = %rule.id, "rule has no conditions and matches every identity");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    fn rule(id: &str, priority: i64) -> AccessRule {
        AccessRule::new(id, priority, Conditions::any(), GrantedAccess::new(Role::User))
    }

    #[test]
    fn priority_order_is_descending_and_stable() {
        let set = RuleSet::new(
            vec![rule("low", 10), rule("tie-a", 50), rule("high", 90), rule("tie-b", 50)],
            GrantedAccess::default(),
        );

        let ids: Vec<&str> = set
            .active_in_priority_order()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["high", "tie-a", "tie-b", "low"]);
    }

    #[test]
    fn inactive_rules_are_excluded() {
        let set = RuleSet::new(vec![rule("on", 1), rule("off", 2).inactive()], GrantedAccess::default());
        let ids: Vec<&str> = set
            .active_in_priority_order()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["on"]);
    }

    #[test]
    fn validate_rejects_duplicate_and_blank_ids() {
        let dup = RuleSet::new(vec![rule("a", 1), rule("a", 2)], GrantedAccess::default());
        assert!(matches!(dup.validate(), Err(DomainError::Duplicate(_))));

        let blank = RuleSet::new(vec![rule(" ", 1)], GrantedAccess::default());
        assert!(matches!(blank.validate(), Err(DomainError::InvalidId(_))));

        assert!(RuleSet::default().validate().is_ok());
    }

    #[test]
    fn parses_portal_rule_document() {
        let json = r#"{
            "rules": [{
                "id": "csrd-group",
                "name": "CSRD Group Access",
                "cidaasConditions": { "groups": ["csrd-team", "sustainability"] },
                "grantedAccess": {
                    "applications": ["platform", "csrd"],
                    "functions": ["lagebericht"],
                    "permissions": ["csrd.access"],
                    "role": "user"
                },
                "priority": 70,
                "isActive": true
            }],
            "defaultAccess": { "applications": ["platform"], "role": "guest" }
        }"#;

        let set: RuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.rules.len(), 1);
        let rule = &set.rules[0];
        assert_eq!(rule.priority, 70);
        assert_eq!(rule.conditions.clauses().len(), 1);
        assert_eq!(rule.granted_access.role, Some(Role::User));
        assert_eq!(set.default_access.role, Some(Role::Guest));
        assert!(set.get(&RuleId::new("csrd-group")).is_some());
    }

    #[test]
    fn rule_without_grant_or_flag_defaults_to_empty_and_active() {
        let rule: AccessRule = serde_json::from_str(r#"{"id": "bare", "conditions": {}}"#).unwrap();
        assert!(rule.is_active);
        assert_eq!(rule.granted_access, GrantedAccess::default());
        assert!(rule.conditions.is_vacuous());
    }

    #[test]
    fn rule_without_conditions_key_is_rejected() {
        let missing = serde_json::from_str::<AccessRule>(r#"{"id": "bare"}"#).unwrap_err();
        assert!(missing.to_string().contains("conditions"));

        let misspelled = serde_json::from_str::<AccessRule>(
            r#"{"id": "only-ceo", "condtions": {"email": "ceo@acme.io"}}"#,
        );
        assert!(misspelled.is_err());
    }
}
