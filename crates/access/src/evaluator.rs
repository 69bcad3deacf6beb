//! Policy evaluation: identity + rule set → access grant.
//!
//! - No IO
//! - No panics
//! - No shared state (same inputs, same grant)

use serde::{Deserialize, Serialize};

use crate::conditions::{ConditionMatcher, MissingAttributePolicy};
use crate::grant::{AccessGrant, GrantedAccess};
use crate::identity::IdentityRecord;
use crate::rules::{AccessRule, RuleSet, active_in_priority_order};
use crate::store::RuleSetProvider;

/// Evaluator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub missing_attribute: MissingAttributePolicy,
}

/// Runs the matcher and merger over a prioritized rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyEvaluator {
    matcher: ConditionMatcher,
}

impl PolicyEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            matcher: ConditionMatcher::new(config.missing_attribute),
        }
    }

    pub fn matcher(&self) -> &ConditionMatcher {
        &self.matcher
    }

    /// Evaluate against a rule set, starting from its own default access.
    pub fn evaluate(&self, identity: &IdentityRecord, rule_set: &RuleSet) -> AccessGrant {
        self.evaluate_with_default(identity, &rule_set.rules, &rule_set.default_access)
    }

    /// Evaluate against one snapshot taken from `provider` at call start.
    pub fn evaluate_snapshot(
        &self,
        identity: &IdentityRecord,
        provider: &dyn RuleSetProvider,
    ) -> AccessGrant {
        let snapshot = provider.snapshot();
        self.evaluate(identity, &snapshot)
    }

    /// Evaluate `rules` on top of `default_access`.
    ///
    /// 1. keep active rules
    /// 2. order by priority, highest first (stable for ties)
    /// 3. merge every matching rule into the accumulator, recording its id
    ///
    /// An empty rule list yields exactly the default access with no applied
    /// rules.
    pub fn evaluate_with_default(
        &self,
        identity: &IdentityRecord,
        rules: &[AccessRule],
        default_access: &GrantedAccess,
    ) -> AccessGrant {
        let mut grant = AccessGrant::from_default(default_access);

        for rule in active_in_priority_order(rules) {
            if !self.matcher.matches(identity, &rule.conditions) {
                tracing::trace!(
                    rule_id = %rule.id,
                    failing = ?self.matcher.failing_categories(identity, &rule.conditions),
                    "rule skipped"
                );
                continue;
            }

            tracing::debug!(rule_id = %rule.id, priority = rule.priority, "rule matched");
            grant = grant.merge(&rule.granted_access).applied(rule.id.clone());
        }

        tracing::debug!(
            subject = identity.sub.as_ref().map(|s| s.as_str()).unwrap_or("-"),
            role = %grant.role,
            applied_rules = ?grant.applied_rules,
            "access evaluated"
        );

        grant
    }
}

/// Evaluate with the default configuration.
pub fn evaluate(
    identity: &IdentityRecord,
    rules: &[AccessRule],
    default_access: &GrantedAccess,
) -> AccessGrant {
    PolicyEvaluator::default().evaluate_with_default(identity, rules, default_access)
}
