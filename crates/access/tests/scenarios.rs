use std::collections::BTreeSet;
use std::sync::Arc;

use portal_access::{
    AccessGrant, Application, CatalogOverride, CatalogOverrides, EvaluatorConfig, FunctionRef,
    GrantedAccess, IdentityProjector, IdentityRecord, InMemoryRuleSetStore, MissingAttributePolicy,
    Permission, PolicyEvaluator, Role, RuleSetProvider, User, apply_overrides, filter, reference,
};
use portal_core::{ApplicationId, RuleId};

fn apps(ids: &[&str]) -> BTreeSet<ApplicationId> {
    ids.iter().map(|id| ApplicationId::new(*id)).collect()
}

fn functions(ids: &[&str]) -> BTreeSet<FunctionRef> {
    ids.iter().map(|id| FunctionRef::new(*id)).collect()
}

fn permissions(names: &[&str]) -> BTreeSet<Permission> {
    names.iter().map(|name| Permission::new(*name)).collect()
}

fn rules(ids: &[&str]) -> Vec<RuleId> {
    ids.iter().map(|id| RuleId::new(*id)).collect()
}

fn evaluate(identity: &IdentityRecord) -> AccessGrant {
    PolicyEvaluator::default().evaluate(identity, &reference::rule_set())
}

fn user_for(identity: &IdentityRecord) -> User {
    IdentityProjector::default().project(identity, &evaluate(identity))
}

fn visible(catalog: &[Application]) -> Vec<(String, Vec<String>)> {
    catalog
        .iter()
        .map(|app| {
            (
                app.id.to_string(),
                app.functions.iter().map(|f| f.id.to_string()).collect(),
            )
        })
        .collect()
}

#[test]
fn admin_domain_identity_merges_admin_and_domain_rules() {
    let identity = IdentityRecord::default()
        .with_email("tobias.oberrauch@audius.de")
        .with_roles(["admin"]);

    let grant = evaluate(&identity);

    assert_eq!(grant.role, Role::Admin);
    assert_eq!(grant.applications, apps(&["platform", "benchmark", "csrd", "support"]));
    assert_eq!(grant.functions, functions(&["*", "lagebericht", "zero-level-support"]));
    assert_eq!(grant.permissions, permissions(&["*", "support.access", "support.tickets"]));
    assert_eq!(grant.applied_rules, rules(&["admin-rule", "audius-domain"]));
}

#[test]
fn basic_subscriber_gets_only_basic_rule() {
    let identity = IdentityRecord::default().with_subscription("basic");

    let grant = evaluate(&identity);

    assert_eq!(grant.applications, apps(&["platform"]));
    assert_eq!(grant.functions, functions(&["lagebericht"]));
    assert!(grant.permissions.is_empty());
    assert_eq!(grant.role, Role::User);
    assert_eq!(grant.applied_rules, rules(&["basic-subscription"]));
}

#[test]
fn unknown_identity_gets_default_access_exactly() {
    for email in ["x@external.com", "random@nowhere.com"] {
        let grant = evaluate(&IdentityRecord::default().with_email(email));
        let expected =
            AccessGrant::from_default(&GrantedAccess::new(Role::Guest).with_applications(["platform"]));
        assert_eq!(grant, expected);
        assert!(grant.applied_rules.is_empty());
    }
}

#[test]
fn evaluation_is_idempotent() {
    let identity = IdentityRecord::new("professional-user")
        .with_email("user@audius.de")
        .with_groups(["csrd-team"])
        .with_roles(["user"])
        .with_subscription("professional");

    assert_eq!(evaluate(&identity), evaluate(&identity));
}

#[test]
fn vacuous_policy_reproduces_directory_sync_matching() {
    let evaluator = PolicyEvaluator::new(EvaluatorConfig {
        missing_attribute: MissingAttributePolicy::Vacuous,
    });
    let identity = IdentityRecord::default().with_subscription("basic");

    let grant = evaluator.evaluate(&identity, &reference::rule_set());

    // No email, roles or groups: every rule on those categories passes.
    assert_eq!(
        grant.applied_rules,
        rules(&["admin-rule", "csrd-group", "audius-domain", "basic-subscription"])
    );
    assert_eq!(grant.role, Role::Admin);
}

#[test]
fn admin_sees_full_catalog() {
    let admin = user_for(
        &IdentityRecord::new("admin-test")
            .with_email("tobias.oberrauch@audius.de")
            .with_roles(["admin"])
            .with_status("VERIFIED"),
    );

    let filtered = filter(&reference::catalog(), &admin);
    assert_eq!(filtered, reference::catalog());
}

#[test]
fn professional_user_sees_permitted_functions_only() {
    let user = user_for(
        &IdentityRecord::new("professional-user")
            .with_email("user@audius.de")
            .with_name("Professional", "User")
            .with_groups(["csrd-team"])
            .with_roles(["user"])
            .with_subscription("professional")
            .with_status("VERIFIED"),
    );
    assert_eq!(
        user.directory.applied_rules,
        rules(&["professional-subscription", "csrd-group", "audius-domain"])
    );

    let filtered = filter(&reference::catalog(), &user);
    assert_eq!(
        visible(&filtered),
        vec![
            ("platform".to_string(), vec!["lagebericht".to_string()]),
            ("benchmark".to_string(), vec!["product-benchmark".to_string()]),
            ("csrd".to_string(), vec!["wesentlichkeitsanalyse".to_string()]),
            ("support".to_string(), vec!["zero-level-support".to_string()]),
        ]
    );
}

#[test]
fn basic_and_guest_users_see_platform_only() {
    let basic = user_for(
        &IdentityRecord::new("basic-user")
            .with_email("basic@example.com")
            .with_subscription("basic")
            .with_status("VERIFIED"),
    );
    assert_eq!(
        visible(&filter(&reference::catalog(), &basic)),
        vec![("platform".to_string(), vec!["lagebericht".to_string()])]
    );

    let guest = user_for(
        &IdentityRecord::new("external-user")
            .with_email("external@external.com")
            .with_status("VERIFIED"),
    );
    assert_eq!(
        visible(&filter(&reference::catalog(), &guest)),
        vec![("platform".to_string(), vec![])]
    );
}

#[test]
fn overrides_apply_before_filtering() {
    let admin = user_for(
        &IdentityRecord::new("admin-test")
            .with_email("admin@clevercompany.ai")
            .with_roles(["super-admin"])
            .with_status("ACTIVE"),
    );

    let mut overrides = CatalogOverrides::new();
    overrides.set_application(
        &ApplicationId::new("csrd"),
        CatalogOverride {
            enabled: Some(false),
            ..Default::default()
        },
    );

    let catalog = apply_overrides(&reference::catalog(), &overrides);
    let ids: Vec<String> = filter(&catalog, &admin).iter().map(|a| a.id.to_string()).collect();
    assert_eq!(ids, vec!["platform", "benchmark", "support"]);
}

#[test]
fn concurrent_evaluations_share_one_snapshot_store() {
    let store = Arc::new(InMemoryRuleSetStore::new(reference::rule_set()));
    let identity = IdentityRecord::default().with_subscription("basic");
    let expected = evaluate(&identity);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let identity = identity.clone();
            std::thread::spawn(move || {
                PolicyEvaluator::default().evaluate_snapshot(&identity, store.as_ref() as &dyn RuleSetProvider)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
