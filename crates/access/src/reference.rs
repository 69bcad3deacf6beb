//! The portal's shipped default configuration.

use std::collections::BTreeSet;

use crate::catalog::{AccessRequirements, AppFunction, Application};
use crate::conditions::{CategoryClause, Conditions};
use crate::grant::GrantedAccess;
use crate::roles::Role;
use crate::rules::{AccessRule, RuleSet};

fn values(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Default rule set: admin list, subscription tiers, company domains and the
/// CSRD working group. Unmatched identities get the platform as guest.
pub fn rule_set() -> RuleSet {
    let rules = vec![
        AccessRule::new(
            "admin-rule",
            100,
            Conditions::any()
                .with(CategoryClause::Email(values(&[
                    "tobias.oberrauch@audius.de",
                    "admin@clevercompany.ai",
                ])))
                .with(CategoryClause::Roles(values(&["admin", "super-admin"]))),
            GrantedAccess::new(Role::Admin)
                .with_applications(["platform", "benchmark", "csrd", "support"])
                .with_functions(["*"])
                .with_permissions(["*"]),
        )
        .named("Admin Access", "Full access for administrators"),
        AccessRule::new(
            "professional-subscription",
            80,
            Conditions::any().with(CategoryClause::Subscription(values(&[
                "clevercsrd-professional-b1",
                "professional",
                "enterprise",
            ]))),
            GrantedAccess::new(Role::User)
                .with_applications(["platform", "benchmark", "csrd"])
                .with_functions([
                    "lagebericht",
                    "product-benchmark",
                    "wesentlichkeitsanalyse",
                    "csrd-reporting",
                ])
                .with_permissions([
                    "benchmark.access",
                    "benchmark.products",
                    "csrd.access",
                    "csrd.analysis",
                ]),
        )
        .named(
            "Professional Subscription Access",
            "Access based on professional subscription",
        ),
        AccessRule::new(
            "audius-domain",
            60,
            Conditions::any().with(CategoryClause::EmailDomain(values(&[
                "audius.de",
                "clevercompany.ai",
            ]))),
            GrantedAccess::new(Role::User)
                .with_applications(["platform", "support"])
                .with_functions(["lagebericht", "zero-level-support"])
                .with_permissions(["support.access", "support.tickets"]),
        )
        .named("Audius Company Access", "Access for audius.de domain users"),
        AccessRule::new(
            "csrd-group",
            70,
            Conditions::any().with(CategoryClause::Groups(values(&["csrd-team", "sustainability"]))),
            GrantedAccess::new(Role::User)
                .with_applications(["platform", "csrd"])
                .with_functions(["lagebericht", "wesentlichkeitsanalyse", "csrd-reporting"])
                .with_permissions(["csrd.access", "csrd.analysis", "csrd.reporting"]),
        )
        .named("CSRD Group Access", "Access for CSRD working group members"),
        AccessRule::new(
            "basic-subscription",
            40,
            Conditions::any().with(CategoryClause::Subscription(values(&["basic", "starter"]))),
            GrantedAccess::new(Role::User)
                .with_applications(["platform"])
                .with_functions(["lagebericht"]),
        )
        .named("Basic Subscription Access", "Limited access for basic subscription"),
    ];

    RuleSet::new(rules, GrantedAccess::new(Role::Guest).with_applications(["platform"]))
}

fn app(id: &str, name: &str, description: &str, access: AccessRequirements) -> Application {
    let mut app = Application::new(id, access);
    app.name = name.to_string();
    app.description = description.to_string();
    app.url = if id == "platform" { "/".to_string() } else { format!("/{id}") };
    app
}

fn function(app_id: &str, id: &str, name: &str, access: AccessRequirements) -> AppFunction {
    let mut function = AppFunction::new(id, access);
    function.name = name.to_string();
    function.url = if app_id == "platform" {
        format!("/{id}")
    } else {
        format!("/{app_id}/{id}")
    };
    function
}

/// Default application catalog.
pub fn catalog() -> Vec<Application> {
    let user = || AccessRequirements::default().role(Role::User);
    let admin = || AccessRequirements::default().role(Role::Admin);

    vec![
        app(
            "platform",
            "CleverCompany",
            "Your comprehensive digital workspace hub",
            AccessRequirements::default().role(Role::Guest),
        )
        .with_function(function("platform", "lagebericht", "Lagebericht", user())),
        app(
            "benchmark",
            "CleverBenchmark",
            "Performance monitoring and analytics platform",
            user().permissions(["benchmark.access"]),
        )
        .with_function(function(
            "benchmark",
            "product-benchmark",
            "Produkt Benchmark",
            user().permissions(["benchmark.products"]),
        ))
        .with_function(function(
            "benchmark",
            "market-intelligence",
            "Market Intelligence",
            user().permissions(["benchmark.market"]),
        ))
        .with_function(function(
            "benchmark",
            "competitive-intelligence",
            "Competitive Intelligence",
            admin().permissions(["benchmark.competitive"]),
        )),
        app(
            "csrd",
            "CleverCSRD",
            "Corporate Sustainability Reporting Directive compliance",
            user().permissions(["csrd.access"]),
        )
        .with_function(function(
            "csrd",
            "wesentlichkeitsanalyse",
            "Wesentlichkeitsanalyse",
            user().permissions(["csrd.analysis"]),
        ))
        .with_function(function(
            "csrd",
            "csrd-reporting",
            "CSRD",
            admin().permissions(["csrd.reporting"]),
        )),
        app(
            "support",
            "CleverSupport",
            "Customer support and ticketing",
            user().permissions(["support.access"]),
        )
        .with_function(function(
            "support",
            "zero-level-support",
            "Zero Level Support",
            user().permissions(["support.tickets"]),
        )),
    ]
}
