//! Rule conditions and the matcher that evaluates them.
//!
//! A rule's conditions are a list of [`CategoryClause`]s. Clauses are AND-ed:
//! every clause must pass. Inside a clause the accepted values are OR-ed: the
//! identity needs to hit any one of them. A rule with no clauses matches
//! every identity.
//!
//! On the wire, conditions are the flat object used by the portal's rule
//! documents (`{"email": [...], "emailDomain": "...", "customFields": {...}}`),
//! where every category accepts a single string or a list.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::IdentityRecord;

/// How a clause behaves when the identity lacks the attribute it checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAttributePolicy {
    /// Absent attribute fails the clause.
    #[default]
    Deny,
    /// Absent attribute passes the clause (directory-sync compatible mode).
    ///
    /// Rules conditioned on e.g. `groups` then match identities that carry no
    /// groups at all.
    Vacuous,
}

impl core::str::FromStr for MissingAttributePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "vacuous" => Ok(Self::Vacuous),
            other => Err(format!("unknown missing-attribute policy '{other}'")),
        }
    }
}

/// Condition category (one facet of an identity a rule can constrain on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Email,
    EmailDomain,
    Groups,
    Roles,
    Subscription,
    CustomField,
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Category::Email => "email",
            Category::EmailDomain => "emailDomain",
            Category::Groups => "groups",
            Category::Roles => "roles",
            Category::Subscription => "subscription",
            Category::CustomField => "customFields",
        };
        f.write_str(name)
    }
}

/// One AND-ed clause; its accepted values are OR-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryClause {
    Email(BTreeSet<String>),
    /// Compared ASCII-case-insensitively.
    EmailDomain(BTreeSet<String>),
    /// Non-empty intersection with the identity's groups.
    Groups(BTreeSet<String>),
    /// Non-empty intersection with the identity's directory roles.
    Roles(BTreeSet<String>),
    Subscription(BTreeSet<String>),
    CustomField { field: String, value: Value },
}

/// Result of checking a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseOutcome {
    Satisfied,
    Unsatisfied,
    AttributeMissing,
}

impl CategoryClause {
    pub fn category(&self) -> Category {
        match self {
            CategoryClause::Email(_) => Category::Email,
            CategoryClause::EmailDomain(_) => Category::EmailDomain,
            CategoryClause::Groups(_) => Category::Groups,
            CategoryClause::Roles(_) => Category::Roles,
            CategoryClause::Subscription(_) => Category::Subscription,
            CategoryClause::CustomField { .. } => Category::CustomField,
        }
    }

    pub fn evaluate(&self, identity: &IdentityRecord) -> ClauseOutcome {
        match self {
            CategoryClause::Email(accepted) => match identity.email() {
                None => ClauseOutcome::AttributeMissing,
                Some(email) => outcome(accepted.contains(email)),
            },
            CategoryClause::EmailDomain(accepted) => match identity.email() {
                None => ClauseOutcome::AttributeMissing,
                Some(_) => outcome(identity.email_domain().is_some_and(|domain| {
                    accepted.iter().any(|d| d.eq_ignore_ascii_case(domain))
                })),
            },
            CategoryClause::Groups(accepted) => intersects(accepted, &identity.groups),
            CategoryClause::Roles(accepted) => intersects(accepted, &identity.roles),
            CategoryClause::Subscription(accepted) => match identity.subscription() {
                None => ClauseOutcome::AttributeMissing,
                Some(subscription) => outcome(accepted.contains(subscription)),
            },
            CategoryClause::CustomField { field, value } => match identity.attribute(field) {
                None => ClauseOutcome::AttributeMissing,
                Some(actual) => outcome(&actual == value),
            },
        }
    }
}

fn outcome(hit: bool) -> ClauseOutcome {
    if hit {
        ClauseOutcome::Satisfied
    } else {
        ClauseOutcome::Unsatisfied
    }
}

fn intersects(accepted: &BTreeSet<String>, held: &BTreeSet<String>) -> ClauseOutcome {
    if held.is_empty() {
        return ClauseOutcome::AttributeMissing;
    }
    outcome(accepted.iter().any(|value| held.contains(value)))
}

/// The full condition set of a rule: `all(clauses) => any(values)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConditions", into = "RawConditions")]
pub struct Conditions(Vec<CategoryClause>);

impl Conditions {
    pub fn new(clauses: Vec<CategoryClause>) -> Self {
        Self(clauses)
    }

    /// Matches every identity.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with(mut self, clause: CategoryClause) -> Self {
        self.0.push(clause);
        self
    }

    pub fn clauses(&self) -> &[CategoryClause] {
        &self.0
    }

    /// A vacuous condition set constrains nothing and matches everyone.
    pub fn is_vacuous(&self) -> bool {
        self.0.is_empty()
    }
}

/// Evaluates a rule's conditions against one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionMatcher {
    policy: MissingAttributePolicy,
}

impl ConditionMatcher {
    pub fn new(policy: MissingAttributePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingAttributePolicy {
        self.policy
    }

    pub fn matches(&self, identity: &IdentityRecord, conditions: &Conditions) -> bool {
        conditions
            .clauses()
            .iter()
            .all(|clause| self.passes(clause.evaluate(identity)))
    }

    /// Categories that fail for this identity, in clause order.
    pub fn failing_categories(
        &self,
        identity: &IdentityRecord,
        conditions: &Conditions,
    ) -> Vec<Category> {
        conditions
            .clauses()
            .iter()
            .filter(|clause| !self.passes(clause.evaluate(identity)))
            .map(CategoryClause::category)
            .collect()
    }

    fn passes(&self, outcome: ClauseOutcome) -> bool {
        match outcome {
            ClauseOutcome::Satisfied => true,
            ClauseOutcome::Unsatisfied => false,
            ClauseOutcome::AttributeMissing => self.policy == MissingAttributePolicy::Vacuous,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for BTreeSet<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(v) => BTreeSet::from([v]),
            OneOrMany::Many(vs) => vs.into_iter().collect(),
        }
    }
}

impl From<BTreeSet<String>> for OneOrMany {
    fn from(value: BTreeSet<String>) -> Self {
        OneOrMany::Many(value.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email_domain: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    groups: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roles: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscription: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_fields: Option<BTreeMap<String, Value>>,
}

impl From<RawConditions> for Conditions {
    fn from(raw: RawConditions) -> Self {
        let mut clauses = Vec::new();
        if let Some(v) = raw.email {
            clauses.push(CategoryClause::Email(v.into()));
        }
        if let Some(v) = raw.email_domain {
            clauses.push(CategoryClause::EmailDomain(v.into()));
        }
        if let Some(v) = raw.groups {
            clauses.push(CategoryClause::Groups(v.into()));
        }
        if let Some(v) = raw.roles {
            clauses.push(CategoryClause::Roles(v.into()));
        }
        if let Some(v) = raw.subscription {
            clauses.push(CategoryClause::Subscription(v.into()));
        }
        for (field, value) in raw.custom_fields.unwrap_or_default() {
            clauses.push(CategoryClause::CustomField { field, value });
        }
        Conditions(clauses)
    }
}

impl From<Conditions> for RawConditions {
    fn from(conditions: Conditions) -> Self {
        let mut raw = RawConditions::default();
        for clause in conditions.0 {
            match clause {
                CategoryClause::Email(v) => extend(&mut raw.email, v),
                CategoryClause::EmailDomain(v) => extend(&mut raw.email_domain, v),
                CategoryClause::Groups(v) => extend(&mut raw.groups, v),
                CategoryClause::Roles(v) => extend(&mut raw.roles, v),
                CategoryClause::Subscription(v) => extend(&mut raw.subscription, v),
                CategoryClause::CustomField { field, value } => {
                    raw.custom_fields.get_or_insert_with(BTreeMap::new).insert(field, value);
                }
            }
        }
        raw
    }
}

// Two clauses of one category collapse into one wire entry holding the union
// of their values.
fn extend(slot: &mut Option<OneOrMany>, values: BTreeSet<String>) {
    let merged = match slot.take() {
        Some(existing) => {
            let mut set: BTreeSet<String> = existing.into();
            set.extend(values);
            set
        }
        None => values,
    };
    *slot = Some(merged.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_single_and_list_values() {
        let json = r#"{
            "email": "a@b.de",
            "emailDomain": ["audius.de", "clevercompany.ai"],
            "customFields": {"tier": "gold"}
        }"#;
        let conditions: Conditions = serde_json::from_str(json).unwrap();

        assert_eq!(
            conditions.clauses(),
            &[
                CategoryClause::Email(set(&["a@b.de"])),
                CategoryClause::EmailDomain(set(&["audius.de", "clevercompany.ai"])),
                CategoryClause::CustomField {
                    field: "tier".to_string(),
                    value: Value::from("gold"),
                },
            ]
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = serde_json::from_str::<Conditions>(r#"{"emailDomian": "audius.de"}"#).unwrap_err();
        assert!(err.to_string().contains("emailDomian"));
    }

    #[test]
    fn empty_object_is_vacuous_and_matches_everyone() {
        let conditions: Conditions = serde_json::from_str("{}").unwrap();
        assert!(conditions.is_vacuous());

        let matcher = ConditionMatcher::default();
        assert!(matcher.matches(&IdentityRecord::default(), &conditions));
    }

    #[test]
    fn categories_are_anded_values_are_ored() {
        let conditions = Conditions::any()
            .with(CategoryClause::Email(set(&["tobias.oberrauch@audius.de", "admin@clevercompany.ai"])))
            .with(CategoryClause::Roles(set(&["admin", "super-admin"])));
        let matcher = ConditionMatcher::default();

        let both = IdentityRecord::default()
            .with_email("admin@clevercompany.ai")
            .with_roles(["super-admin"]);
        assert!(matcher.matches(&both, &conditions));

        let wrong_role = IdentityRecord::default()
            .with_email("admin@clevercompany.ai")
            .with_roles(["user"]);
        assert!(!matcher.matches(&wrong_role, &conditions));
        assert_eq!(
            matcher.failing_categories(&wrong_role, &conditions),
            vec![Category::Roles]
        );
    }

    #[test]
    fn domain_is_derived_from_email() {
        let conditions =
            Conditions::any().with(CategoryClause::EmailDomain(set(&["audius.de"])));
        let matcher = ConditionMatcher::default();

        assert!(matcher.matches(&IdentityRecord::default().with_email("x@Audius.DE"), &conditions));
        assert!(!matcher.matches(&IdentityRecord::default().with_email("x@audius.com"), &conditions));
        assert!(!matcher.matches(&IdentityRecord::default().with_email("broken"), &conditions));
    }

    #[test]
    fn missing_attribute_follows_policy() {
        let conditions = Conditions::any().with(CategoryClause::Groups(set(&["csrd-team"])));
        let sparse = IdentityRecord::default().with_email("x@external.com");

        assert!(!ConditionMatcher::new(MissingAttributePolicy::Deny).matches(&sparse, &conditions));
        assert!(ConditionMatcher::new(MissingAttributePolicy::Vacuous).matches(&sparse, &conditions));

        // A present attribute is checked under both policies.
        let other_group = sparse.clone().with_groups(["finance"]);
        assert!(!ConditionMatcher::new(MissingAttributePolicy::Vacuous).matches(&other_group, &conditions));
    }

    #[test]
    fn empty_accepted_list_never_matches_present_attribute() {
        let conditions: Conditions = serde_json::from_str(r#"{"subscription": []}"#).unwrap();
        let identity = IdentityRecord::default().with_subscription("basic");
        assert!(!ConditionMatcher::new(MissingAttributePolicy::Vacuous).matches(&identity, &conditions));
    }

    #[test]
    fn custom_fields_use_exact_json_equality() {
        let conditions: Conditions =
            serde_json::from_str(r#"{"customFields": {"seats": 5, "region": "eu"}}"#).unwrap();
        let matcher = ConditionMatcher::default();

        let hit = IdentityRecord::default()
            .with_custom_field("seats", 5)
            .with_custom_field("region", "eu");
        assert!(matcher.matches(&hit, &conditions));

        let string_seats = IdentityRecord::default()
            .with_custom_field("seats", "5")
            .with_custom_field("region", "eu");
        assert!(!matcher.matches(&string_seats, &conditions));
    }

    #[test]
    fn policy_parses_from_env_strings() {
        assert_eq!("Vacuous".parse::<MissingAttributePolicy>(), Ok(MissingAttributePolicy::Vacuous));
        assert!("maybe".parse::<MissingAttributePolicy>().is_err());
    }
}
